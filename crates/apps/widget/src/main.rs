use std::env;
use std::fs;
use std::rc::Rc;

use layers::feature::PolygonFeatureSource;
use tracing::info;
use tracing_subscriber::EnvFilter;
use widget::{MapWidget, WidgetConfig, decode_points};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (points_path, offline_path) = parse_args(&args)?;

    let config = WidgetConfig::from_env().map_err(|e| e.to_string())?;
    let points_json = fs::read_to_string(&points_path)
        .map_err(|e| format!("reading {points_path}: {e}"))?;
    let points = decode_points(&points_json).map_err(|e| e.to_string())?;

    let widget = match offline_path {
        Some(path) => {
            let json =
                fs::read_to_string(&path).map_err(|e| format!("reading {path}: {e}"))?;
            let source = PolygonFeatureSource::from_json(path.as_str(), &json)
                .map_err(|e| e.to_string())?;
            info!(polygons = source.features().len(), "using offline reference polygons");
            MapWidget::new(config, Rc::new(source))
        }
        None => MapWidget::with_arcgis(config),
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("tokio runtime: {e}"))?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&rt, async {
        let load = tokio::task::spawn_local(widget.load_reference_layer());
        let checks: Vec<_> = points
            .into_iter()
            .map(|p| tokio::task::spawn_local(widget.place_and_resolve(p).1))
            .collect();

        // A failed load is already logged; queries still run against the service.
        let _ = load.await;
        for check in checks {
            check.await.map_err(|e| format!("visibility check: {e}"))?;
        }
        Ok::<_, String>(())
    })?;

    let summary = serde_json::to_string_pretty(&widget.summary()).map_err(|e| e.to_string())?;
    println!("{summary}");
    Ok(())
}

fn parse_args(args: &[String]) -> Result<(String, Option<String>), String> {
    let mut points = None;
    let mut offline = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--offline" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| "--offline requires a value".to_string())?;
                offline = Some(path.clone());
            }
            "-h" | "--help" => return Err(usage()),
            s if s.starts_with('-') => return Err(format!("unknown arg: {s}\n\n{}", usage())),
            s if points.is_none() => points = Some(s.to_string()),
            s => return Err(format!("unexpected arg: {s}\n\n{}", usage())),
        }
        i += 1;
    }

    let points = points.ok_or_else(usage)?;
    Ok((points, offline))
}

fn usage() -> String {
    "usage: ecomap <points.json> [--offline <polygons.json>]\n\n\
     Places the points, hides those outside the reference layer and prints\n\
     the resulting marker states as JSON. Without --offline the reference\n\
     layer is queried over HTTP (ECOMAP_FEATURE_LAYER_URL, ECOMAP_API_KEY)."
        .to_string()
}
