/// Communications to socios: announcements, promotions, newsletters and
/// reminders, targeted by sector/status/neighborhood filters.

mod repository;

pub use repository::ComunicacionRepository;

use crate::socios::{EstadoSocio, Sector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoComunicacion {
    Anuncio,
    Promocion,
    Newsletter,
    Recordatorio,
}

impl TipoComunicacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoComunicacion::Anuncio => "anuncio",
            TipoComunicacion::Promocion => "promocion",
            TipoComunicacion::Newsletter => "newsletter",
            TipoComunicacion::Recordatorio => "recordatorio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "anuncio" => Some(TipoComunicacion::Anuncio),
            "promocion" => Some(TipoComunicacion::Promocion),
            "newsletter" => Some(TipoComunicacion::Newsletter),
            "recordatorio" => Some(TipoComunicacion::Recordatorio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstadoComunicacion {
    Borrador,
    Enviado,
    Programado,
}

impl EstadoComunicacion {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstadoComunicacion::Borrador => "borrador",
            EstadoComunicacion::Enviado => "enviado",
            EstadoComunicacion::Programado => "programado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "borrador" => Some(EstadoComunicacion::Borrador),
            "enviado" => Some(EstadoComunicacion::Enviado),
            "programado" => Some(EstadoComunicacion::Programado),
            _ => None,
        }
    }
}

/// Who the communication targets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltrosDestinatarios {
    pub sector: Option<Sector>,
    pub estado: Option<EstadoSocio>,
    pub barrio: Option<String>,
}

/// Creator identity snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreadoPor {
    pub id: Option<String>,
    pub email: Option<String>,
    pub nombre: Option<String>,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstadisticasEnvio {
    pub total_enviados: i64,
    pub exitosos: i64,
    pub fallidos: i64,
    pub pendientes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comunicacion {
    pub id: String,
    pub titulo: String,
    pub tipo: TipoComunicacion,
    pub contenido: String,
    pub filtros: FiltrosDestinatarios,
    pub creado_por: CreadoPor,
    pub estado: EstadoComunicacion,
    pub estadisticas: EstadisticasEnvio,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_actualizacion: Option<DateTime<Utc>>,
    pub fecha_envio: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NuevaComunicacion {
    pub titulo: String,
    pub tipo: TipoComunicacion,
    pub contenido: String,
    #[serde(default)]
    pub filtros: FiltrosDestinatarios,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComunicacionUpdate {
    pub titulo: Option<String>,
    pub tipo: Option<TipoComunicacion>,
    pub contenido: Option<String>,
    pub filtros: Option<FiltrosDestinatarios>,
    pub estado: Option<EstadoComunicacion>,
}

/// Aggregate figures over the recent window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComunicacionStats {
    pub total: usize,
    pub enviadas: usize,
    pub borradores: usize,
    pub por_tipo: BTreeMap<String, usize>,
}
