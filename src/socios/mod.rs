/// Member ("socio") domain model
///
/// Fixed catalogs for sectors, per-sector tags, neighborhoods and contact
/// origins, plus the socio record itself. The tag set of a socio is always a
/// subset of the tags implied by its sector set.

mod import;
mod repository;

pub use import::{ImportOutcome, ImportRejection, SocioImporter, COLUMNAS};
pub use repository::SocioRepository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Program sectors a socio can participate in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    Educacion,
    Salud,
    TerceraEdad,
    Deportes,
    Discapacidad,
    Cultural,
    Comunidad,
}

/// All sectors, in catalog order
pub const SECTORES: &[Sector] = &[
    Sector::Educacion,
    Sector::Salud,
    Sector::TerceraEdad,
    Sector::Deportes,
    Sector::Discapacidad,
    Sector::Cultural,
    Sector::Comunidad,
];

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Educacion => "educacion",
            Sector::Salud => "salud",
            Sector::TerceraEdad => "tercera_edad",
            Sector::Deportes => "deportes",
            Sector::Discapacidad => "discapacidad",
            Sector::Cultural => "cultural",
            Sector::Comunidad => "comunidad",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "educacion" => Some(Sector::Educacion),
            "salud" => Some(Sector::Salud),
            "tercera_edad" => Some(Sector::TerceraEdad),
            "deportes" => Some(Sector::Deportes),
            "discapacidad" => Some(Sector::Discapacidad),
            "cultural" => Some(Sector::Cultural),
            "comunidad" => Some(Sector::Comunidad),
            _ => None,
        }
    }

    /// Display label shown to operators and used in spreadsheet columns
    pub fn label(&self) -> &'static str {
        match self {
            Sector::Educacion => "Educación",
            Sector::Salud => "Salud",
            Sector::TerceraEdad => "Tercera Edad",
            Sector::Deportes => "Deportes",
            Sector::Discapacidad => "Discapacidad",
            Sector::Cultural => "Cultural",
            Sector::Comunidad => "Comunidad",
        }
    }

    /// Parse a display label (spreadsheet cell value)
    pub fn parse_label(s: &str) -> Option<Self> {
        SECTORES.iter().copied().find(|sec| sec.label() == s.trim())
    }

    /// Fixed tag list implied by this sector
    pub fn etiquetas(&self) -> &'static [&'static str] {
        match self {
            Sector::Educacion => &[
                "Jardín de Infantes",
                "Escuela Primaria",
                "Escuela Secundaria",
                "Instituto Superior",
                "Universidad",
                "Talleres",
            ],
            Sector::Salud => &[
                "Consultas Médicas",
                "Tratamientos",
                "Plasma Rico en Plaquetas",
                "Rehabilitación",
                "Prevención",
            ],
            Sector::TerceraEdad => &[
                "Grandes Conexiones",
                "Aquagym",
                "Taller de Memoria",
                "Actividades Sociales",
            ],
            Sector::Deportes => &[
                "Fútbol",
                "Natación",
                "Polideportivo",
                "ESD Alfredo Di Stefano",
            ],
            Sector::Discapacidad => &[
                "Centro Santa Inés",
                "Centro de Día CABA",
                "Centro de Día Santa Fe",
                "Programa Ágora",
            ],
            Sector::Cultural => &[
                "Plaza de Artes y Oficios",
                "Actividades Culturales",
                "Eventos",
            ],
            Sector::Comunidad => &[
                "Centro La Huella",
                "Padrinazgo",
                "Programa unoXuno",
                "Voluntariado",
            ],
        }
    }
}

/// Member status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoSocio {
    Activo,
    Inactivo,
    BajaTemporal,
}

impl EstadoSocio {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoSocio::Activo => "activo",
            EstadoSocio::Inactivo => "inactivo",
            EstadoSocio::BajaTemporal => "baja_temporal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "activo" => Some(EstadoSocio::Activo),
            "inactivo" => Some(EstadoSocio::Inactivo),
            "baja_temporal" => Some(EstadoSocio::BajaTemporal),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EstadoSocio::Activo => "Activo",
            EstadoSocio::Inactivo => "Inactivo",
            EstadoSocio::BajaTemporal => "Baja Temporal",
        }
    }
}

/// Accepted contact origins
pub const ORIGENES_CONTACTO: &[&str] = &[
    "Recomendación",
    "Redes Sociales",
    "Página Web",
    "Volante",
    "Evento",
    "Otro",
];

/// Family relationship labels for the optional family-group map
pub const VINCULOS_FAMILIARES: &[&str] = &[
    "Padre",
    "Madre",
    "Hijo/a",
    "Hermano/a",
    "Abuelo/a",
    "Nieto/a",
    "Tío/a",
    "Sobrino/a",
    "Cónyuge",
    "Otro",
];

/// Accepted neighborhoods
pub const BARRIOS: &[&str] = &[
    "González Catán",
    "Laferrere",
    "San Justo",
    "Ramos Mejía",
    "Morón",
    "Ituzaingó",
    "Castelar",
    "Haedo",
    "Villa Luzuriaga",
    "Ciudad Evita",
    "La Tablada",
    "Gregorio de Laferrere",
    "Isidro Casanova",
    "Rafael Castillo",
    "Lomas del Mirador",
    "Villa Madero",
    "Aldo Bonzi",
    "Ciudad Jardín",
    "Villa Fiorito",
    "Otro",
];

/// Union of the fixed tag lists of the given sectors, in selection order,
/// without duplicates
pub fn tags_for_sectores(sectores: &[Sector]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for sector in sectores {
        for tag in sector.etiquetas() {
            if !tags.iter().any(|t| t == tag) {
                tags.push((*tag).to_string());
            }
        }
    }
    tags
}

/// Toggle a sector on a socio's selection, recomputing the tag set as the
/// union of the remaining sectors' tag lists
pub fn toggle_sector(sectores: &mut Vec<Sector>, etiquetas: &mut Vec<String>, sector: Sector) {
    if let Some(pos) = sectores.iter().position(|s| *s == sector) {
        sectores.remove(pos);
    } else {
        sectores.push(sector);
    }
    *etiquetas = tags_for_sectores(sectores);
}

/// Drop tags not implied by any selected sector
pub fn retain_valid_etiquetas(sectores: &[Sector], etiquetas: &[String]) -> Vec<String> {
    let allowed = tags_for_sectores(sectores);
    etiquetas
        .iter()
        .filter(|tag| allowed.iter().any(|a| a == *tag))
        .cloned()
        .collect()
}

/// Member record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Socio {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub barrio: Option<String>,
    pub direccion: Option<String>,
    pub sectores: Vec<Sector>,
    pub etiquetas: Vec<String>,
    pub origen: Option<String>,
    pub observaciones: Option<String>,
    pub estado: EstadoSocio,
    /// relationship label -> DNI of the related socio
    pub grupo_familiar: Option<BTreeMap<String, String>>,
    pub fecha_alta: DateTime<Utc>,
    pub ultima_actividad: DateTime<Utc>,
}

/// Payload for creating a socio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NuevoSocio {
    pub nombre: String,
    pub apellido: String,
    pub dni: String,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub barrio: Option<String>,
    pub direccion: Option<String>,
    #[serde(default)]
    pub sectores: Vec<Sector>,
    #[serde(default)]
    pub etiquetas: Vec<String>,
    pub origen: Option<String>,
    pub observaciones: Option<String>,
    pub grupo_familiar: Option<BTreeMap<String, String>>,
}

/// Partial update with merge semantics; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocioUpdate {
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub email: Option<String>,
    pub telefono: Option<String>,
    pub fecha_nacimiento: Option<String>,
    pub barrio: Option<String>,
    pub direccion: Option<String>,
    pub sectores: Option<Vec<Sector>>,
    pub etiquetas: Option<Vec<String>>,
    pub origen: Option<String>,
    pub observaciones: Option<String>,
    pub estado: Option<EstadoSocio>,
    pub grupo_familiar: Option<BTreeMap<String, String>>,
}

/// Optional filters for listing socios
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocioFilters {
    pub estado: Option<EstadoSocio>,
    pub sector: Option<Sector>,
    pub barrio: Option<String>,
}

/// Registry headcounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocioEstadisticas {
    pub total: i64,
    pub activos: i64,
    pub inactivos: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_union_of_selected_sectors() {
        let sectores = vec![Sector::Deportes, Sector::Salud];
        let tags = tags_for_sectores(&sectores);

        for tag in Sector::Deportes.etiquetas() {
            assert!(tags.iter().any(|t| t == tag));
        }
        for tag in Sector::Salud.etiquetas() {
            assert!(tags.iter().any(|t| t == tag));
        }
        assert_eq!(
            tags.len(),
            Sector::Deportes.etiquetas().len() + Sector::Salud.etiquetas().len()
        );
    }

    #[test]
    fn test_sector_toggle_round_trip() {
        let mut sectores = vec![Sector::Educacion];
        let mut etiquetas = tags_for_sectores(&sectores);
        let before = etiquetas.clone();

        // No sector shares tags with Cultural, so the round trip is exact
        toggle_sector(&mut sectores, &mut etiquetas, Sector::Cultural);
        assert!(sectores.contains(&Sector::Cultural));
        assert!(etiquetas.iter().any(|t| t == "Eventos"));

        toggle_sector(&mut sectores, &mut etiquetas, Sector::Cultural);
        assert!(!sectores.contains(&Sector::Cultural));
        assert_eq!(etiquetas, before);
    }

    #[test]
    fn test_retain_valid_etiquetas() {
        let sectores = vec![Sector::Deportes];
        let etiquetas = vec![
            "Fútbol".to_string(),
            "Aquagym".to_string(), // belongs to Tercera Edad
        ];
        assert_eq!(
            retain_valid_etiquetas(&sectores, &etiquetas),
            vec!["Fútbol".to_string()]
        );
    }

    #[test]
    fn test_sector_label_parse() {
        assert_eq!(Sector::parse_label("Tercera Edad"), Some(Sector::TerceraEdad));
        assert_eq!(Sector::parse_label(" Educación "), Some(Sector::Educacion));
        assert_eq!(Sector::parse_label("Gimnasio"), None);
    }

    #[test]
    fn test_estado_parse() {
        assert_eq!(EstadoSocio::parse("activo"), Some(EstadoSocio::Activo));
        assert_eq!(
            EstadoSocio::parse("baja_temporal"),
            Some(EstadoSocio::BajaTemporal)
        );
        assert_eq!(EstadoSocio::parse("egresado"), None);
    }
}
