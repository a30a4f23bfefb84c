//! Static recyclability guidance per material.

use serde::Serialize;

/// Materials the knowledge base has guidance for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    Styrofoam,
    Plastic,
    Glass,
    Paper,
    Metal,
}

impl Material {
    pub const ALL: [Material; 5] = [
        Material::Styrofoam,
        Material::Plastic,
        Material::Glass,
        Material::Paper,
        Material::Metal,
    ];

    /// Exact, case-insensitive match on the material name
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(label))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Material::Styrofoam => "styrofoam",
            Material::Plastic => "plastic",
            Material::Glass => "glass",
            Material::Paper => "paper",
            Material::Metal => "metal",
        }
    }

    pub fn info(&self) -> &'static MaterialInfo {
        match self {
            Material::Styrofoam => &STYROFOAM,
            Material::Plastic => &PLASTIC,
            Material::Glass => &GLASS,
            Material::Paper => &PAPER,
            Material::Metal => &METAL,
        }
    }
}

/// Recyclability verdict and guidance for one material
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialInfo {
    pub is_recyclable: bool,
    pub message: &'static str,
    pub tips: &'static str,
}

static STYROFOAM: MaterialInfo = MaterialInfo {
    is_recyclable: false,
    message: "Styrofoam is generally not recyclable",
    tips: "Consider alternatives like paper or recyclable plastic containers. Dispose of styrofoam in regular trash.",
};

static PLASTIC: MaterialInfo = MaterialInfo {
    is_recyclable: true,
    message: "Most plastics are recyclable",
    tips: "Check the recycling number on the bottom of plastic items",
};

static GLASS: MaterialInfo = MaterialInfo {
    is_recyclable: true,
    message: "Glass is recyclable and can be recycled endlessly",
    tips: "Rinse containers and remove caps/lids",
};

static PAPER: MaterialInfo = MaterialInfo {
    is_recyclable: true,
    message: "Paper is recyclable",
    tips: "Keep paper clean and dry. Remove any plastic coating",
};

static METAL: MaterialInfo = MaterialInfo {
    is_recyclable: true,
    message: "Metal is highly recyclable",
    tips: "Clean and crush metal cans to save space",
};

/// Guidance returned for any label outside the known materials
pub static UNKNOWN_MATERIAL: MaterialInfo = MaterialInfo {
    is_recyclable: false,
    message: "Unable to determine recyclability",
    tips: "Please consult your local recycling guidelines",
};

/// Look up guidance for a category label. Never fails: unknown labels
/// resolve to [`UNKNOWN_MATERIAL`].
pub fn lookup(category: &str) -> &'static MaterialInfo {
    Material::from_label(category)
        .map(|m| m.info())
        .unwrap_or(&UNKNOWN_MATERIAL)
}
