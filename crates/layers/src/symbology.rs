//! Marker symbols keyed by the category ("pillar") code carried by each point.

/// Which category a marker style belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Energy,
    Water,
    Transportation,
    Buildings,
    Livability,
    Food,
    Waste,
    CleanEvent,
    GreenEvent,
    FoodEvent,
    LivabilityEvent,
    WasteEvent,
    TransportationEvent,
    /// Unknown or missing category code.
    Fallback,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolType {
    PictureMarker,
    SimpleMarker,
}

impl SymbolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolType::PictureMarker => "picture-marker",
            SymbolType::SimpleMarker => "simple-marker",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerStyle {
    pub kind: MarkerKind,
    pub symbol: SymbolType,
    pub icon: Option<&'static str>,
    pub width_px: f32,
    pub height_px: f32,
}

const PICTURE_SIZE_PX: f32 = 35.0;

const fn picture(kind: MarkerKind, icon: &'static str) -> MarkerStyle {
    MarkerStyle {
        kind,
        symbol: SymbolType::PictureMarker,
        icon: Some(icon),
        width_px: PICTURE_SIZE_PX,
        height_px: PICTURE_SIZE_PX,
    }
}

impl MarkerStyle {
    pub const ENERGY: MarkerStyle = picture(MarkerKind::Energy, "icons/energy.png");
    pub const WATER: MarkerStyle = picture(MarkerKind::Water, "icons/water.png");
    pub const TRANSPORTATION: MarkerStyle =
        picture(MarkerKind::Transportation, "icons/transportation.png");
    pub const BUILDINGS: MarkerStyle = picture(MarkerKind::Buildings, "icons/buildings.png");
    pub const LIVABILITY: MarkerStyle = picture(MarkerKind::Livability, "icons/livability.png");
    pub const FOOD: MarkerStyle = picture(MarkerKind::Food, "icons/food.png");
    pub const WASTE: MarkerStyle = picture(MarkerKind::Waste, "icons/waste.png");
    pub const CLEAN_EVENT: MarkerStyle = picture(
        MarkerKind::CleanEvent,
        "https://maps.google.com/mapfiles/ms/icons/green-dot.png",
    );
    pub const GREEN_EVENT: MarkerStyle = picture(
        MarkerKind::GreenEvent,
        "https://maps.google.com/mapfiles/ms/icons/yellow-dot.png",
    );
    pub const FOOD_EVENT: MarkerStyle = picture(
        MarkerKind::FoodEvent,
        "https://maps.google.com/mapfiles/ms/icons/red-dot.png",
    );
    pub const LIVABILITY_EVENT: MarkerStyle = picture(
        MarkerKind::LivabilityEvent,
        "https://maps.google.com/mapfiles/ms/icons/blue-dot.png",
    );
    pub const WASTE_EVENT: MarkerStyle = picture(
        MarkerKind::WasteEvent,
        "https://maps.google.com/mapfiles/ms/icons/blue-dot.png",
    );
    pub const TRANSPORTATION_EVENT: MarkerStyle =
        picture(MarkerKind::TransportationEvent, "icons/lightblue-dot.png");

    /// The map's default point symbol, used for unknown categories.
    pub const FALLBACK: MarkerStyle = MarkerStyle {
        kind: MarkerKind::Fallback,
        symbol: SymbolType::SimpleMarker,
        icon: None,
        width_px: 12.0,
        height_px: 12.0,
    };
}

impl MarkerKind {
    /// Exact match on the decimal code; anything else is `None`.
    pub fn from_code(code: &str) -> Option<MarkerKind> {
        let kind = match code {
            "1" => MarkerKind::Energy,
            "2" => MarkerKind::Water,
            "3" => MarkerKind::Transportation,
            "4" => MarkerKind::Buildings,
            "5" => MarkerKind::Livability,
            "6" => MarkerKind::Food,
            "7" => MarkerKind::Waste,
            "8" => MarkerKind::CleanEvent,
            "9" => MarkerKind::GreenEvent,
            "10" => MarkerKind::FoodEvent,
            "11" => MarkerKind::LivabilityEvent,
            "12" => MarkerKind::WasteEvent,
            "13" => MarkerKind::TransportationEvent,
            _ => return None,
        };
        Some(kind)
    }

    pub fn style(&self) -> MarkerStyle {
        match self {
            MarkerKind::Energy => MarkerStyle::ENERGY,
            MarkerKind::Water => MarkerStyle::WATER,
            MarkerKind::Transportation => MarkerStyle::TRANSPORTATION,
            MarkerKind::Buildings => MarkerStyle::BUILDINGS,
            MarkerKind::Livability => MarkerStyle::LIVABILITY,
            MarkerKind::Food => MarkerStyle::FOOD,
            MarkerKind::Waste => MarkerStyle::WASTE,
            MarkerKind::CleanEvent => MarkerStyle::CLEAN_EVENT,
            MarkerKind::GreenEvent => MarkerStyle::GREEN_EVENT,
            MarkerKind::FoodEvent => MarkerStyle::FOOD_EVENT,
            MarkerKind::LivabilityEvent => MarkerStyle::LIVABILITY_EVENT,
            MarkerKind::WasteEvent => MarkerStyle::WASTE_EVENT,
            MarkerKind::TransportationEvent => MarkerStyle::TRANSPORTATION_EVENT,
            MarkerKind::Fallback => MarkerStyle::FALLBACK,
        }
    }
}

/// Style for a category code. Total: unknown codes get [`MarkerStyle::FALLBACK`].
pub fn style_for(code: &str) -> MarkerStyle {
    MarkerKind::from_code(code)
        .unwrap_or(MarkerKind::Fallback)
        .style()
}
