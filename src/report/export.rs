/// Report builders over the socio registry
///
/// Builds the export workbook (main sheet plus derived statistics sheets),
/// the paginated print document and the monthly summary. Date formatting
/// follows the es-AR day/month/year convention used by the operators.
use crate::{
    report::{Document, DocumentHeader, DocumentPage, Sheet, Workbook},
    socios::{EstadoSocio, Sector, Socio, COLUMNAS, SECTORES},
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const TITULO_REPORTE: &str = "Reporte de Socios - Obra del Padre Mario";
const FILAS_POR_PAGINA: usize = 25;

/// Filters echoed into the report header; the socio list is already filtered
/// by the caller
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    pub estado: Option<EstadoSocio>,
    pub sector: Option<Sector>,
    pub barrio: Option<String>,
    pub fecha_desde: Option<NaiveDate>,
    pub fecha_hasta: Option<NaiveDate>,
}

impl ReportFilters {
    fn descripciones(&self) -> Vec<String> {
        let mut lineas = Vec::new();
        if let Some(estado) = self.estado {
            lineas.push(format!("Estado: {}", estado.label()));
        }
        if let Some(sector) = self.sector {
            lineas.push(format!("Sector: {}", sector.label()));
        }
        if let Some(ref barrio) = self.barrio {
            lineas.push(format!("Barrio: {}", barrio));
        }
        if self.fecha_desde.is_some() || self.fecha_hasta.is_some() {
            let desde = self.fecha_desde.map(fmt_naive).unwrap_or_default();
            let hasta = self.fecha_hasta.map(fmt_naive).unwrap_or_default();
            lineas.push(format!("Período: {} - {}", desde, hasta));
        }
        lineas
    }
}

/// Monthly intake summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporteMensual {
    pub total_nuevos: usize,
    pub por_sector: BTreeMap<String, usize>,
    pub por_barrio: BTreeMap<String, usize>,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: NaiveDate,
}

pub struct ReportBuilder;

impl ReportBuilder {
    /// Workbook export: "Socios" sheet plus "Estadísticas" (by sector),
    /// "Por Estado" and "Información" sheets
    pub fn workbook(socios: &[Socio], filtros: &ReportFilters) -> Workbook {
        let mut principal = Sheet::new(
            "Socios",
            &[
                "Nombre",
                "DNI",
                "Email",
                "Teléfono",
                "Estado",
                "Sectores",
                "Barrio",
                "Fecha Alta",
                "Última Actividad",
                "Origen",
            ],
        );
        for socio in socios {
            principal.push_row(vec![
                socio_nombre(socio),
                socio.dni.clone(),
                socio.email.clone().unwrap_or_default(),
                socio.telefono.clone().unwrap_or_default(),
                socio.estado.label().to_string(),
                sectores_labels(socio),
                socio.barrio.clone().unwrap_or_default(),
                fmt_fecha(socio.fecha_alta),
                fmt_fecha(socio.ultima_actividad),
                socio.origen.clone().unwrap_or_default(),
            ]);
        }

        let mut estadisticas = Sheet::new("Estadísticas", &["Sector", "Cantidad"]);
        for (sector, cantidad) in conteo_por_sector(socios) {
            estadisticas.push_row(vec![sector, cantidad.to_string()]);
        }

        let mut por_estado = Sheet::new("Por Estado", &["Estado", "Cantidad"]);
        for estado in [
            EstadoSocio::Activo,
            EstadoSocio::Inactivo,
            EstadoSocio::BajaTemporal,
        ] {
            let cantidad = socios.iter().filter(|s| s.estado == estado).count();
            if cantidad > 0 {
                por_estado.push_row(vec![estado.label().to_string(), cantidad.to_string()]);
            }
        }

        let mut informacion = Sheet::new("Información", &["Campo", "Valor"]);
        informacion.push_row(vec![
            "Fecha de generación".to_string(),
            fmt_fecha(Utc::now()),
        ]);
        informacion.push_row(vec!["Total de socios".to_string(), socios.len().to_string()]);
        informacion.push_row(vec![
            "Socios activos".to_string(),
            socios
                .iter()
                .filter(|s| s.estado == EstadoSocio::Activo)
                .count()
                .to_string(),
        ]);
        informacion.push_row(vec![
            "Socios inactivos".to_string(),
            socios
                .iter()
                .filter(|s| s.estado == EstadoSocio::Inactivo)
                .count()
                .to_string(),
        ]);
        let descripciones = filtros.descripciones();
        if !descripciones.is_empty() {
            informacion.push_row(vec!["Filtros aplicados".to_string(), "Sí".to_string()]);
            for linea in descripciones {
                match linea.split_once(": ") {
                    Some((campo, valor)) => {
                        informacion.push_row(vec![campo.to_string(), valor.to_string()])
                    }
                    None => informacion.push_row(vec![linea, String::new()]),
                }
            }
        }

        Workbook {
            sheets: vec![principal, estadisticas, por_estado, informacion],
        }
    }

    /// Print-style document: header block, paginated main table and the
    /// per-sector summary table
    pub fn documento(socios: &[Socio], filtros: &ReportFilters) -> Document {
        let table_header: Vec<String> = [
            "Nombre",
            "DNI",
            "Email",
            "Teléfono",
            "Estado",
            "Sectores",
            "Barrio",
            "Fecha Alta",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect();

        let rows: Vec<Vec<String>> = socios
            .iter()
            .map(|socio| {
                vec![
                    socio_nombre(socio),
                    socio.dni.clone(),
                    socio.email.clone().unwrap_or_default(),
                    socio.telefono.clone().unwrap_or_default(),
                    socio.estado.label().to_string(),
                    sectores_labels(socio),
                    socio.barrio.clone().unwrap_or_default(),
                    fmt_fecha(socio.fecha_alta),
                ]
            })
            .collect();

        let pages: Vec<DocumentPage> = rows
            .chunks(FILAS_POR_PAGINA)
            .enumerate()
            .map(|(i, chunk)| DocumentPage {
                number: i + 1,
                rows: chunk.to_vec(),
            })
            .collect();

        let mut sector_summary = Sheet::new("Estadísticas por Sector", &["Sector", "Cantidad"]);
        for (sector, cantidad) in conteo_por_sector(socios) {
            sector_summary.push_row(vec![sector, cantidad.to_string()]);
        }

        Document {
            header: DocumentHeader {
                title: TITULO_REPORTE.to_string(),
                generated_at: fmt_fecha(Utc::now()),
                total: socios.len(),
                filters: filtros.descripciones(),
            },
            table_header,
            pages,
            sector_summary,
        }
    }

    /// Socios added in the current month, grouped by sector and barrio
    pub fn mensual(socios: &[Socio], hoy: NaiveDate) -> ReporteMensual {
        let inicio = hoy.with_day(1).expect("day 1 always valid");
        let fin = ultimo_dia_del_mes(hoy);

        let del_mes: Vec<&Socio> = socios
            .iter()
            .filter(|s| {
                let alta = s.fecha_alta.date_naive();
                alta >= inicio && alta <= fin
            })
            .collect();

        let mut por_sector: BTreeMap<String, usize> = BTreeMap::new();
        let mut por_barrio: BTreeMap<String, usize> = BTreeMap::new();
        for socio in &del_mes {
            for sector in &socio.sectores {
                *por_sector.entry(sector.label().to_string()).or_default() += 1;
            }
            if let Some(ref barrio) = socio.barrio {
                *por_barrio.entry(barrio.clone()).or_default() += 1;
            }
        }

        ReporteMensual {
            total_nuevos: del_mes.len(),
            por_sector,
            por_barrio,
            fecha_inicio: inicio,
            fecha_fin: fin,
        }
    }
}

/// Import template: the fixed header plus two example rows
pub fn plantilla_importacion() -> Workbook {
    let mut sheet = Sheet::new("Socios", COLUMNAS);
    sheet.push_row(vec![
        "Juan".to_string(),
        "Pérez".to_string(),
        "12345678".to_string(),
        "juan.perez@email.com".to_string(),
        "1234567890".to_string(),
        "1990-01-15".to_string(),
        "San Justo".to_string(),
        "Av. Principal 123".to_string(),
        "Deportes,Educación".to_string(),
        "Fútbol,Natación".to_string(),
        "Recomendación".to_string(),
        "Socio activo".to_string(),
    ]);
    sheet.push_row(vec![
        "María".to_string(),
        "García".to_string(),
        "87654321".to_string(),
        "maria.garcia@email.com".to_string(),
        "0987654321".to_string(),
        "1985-05-20".to_string(),
        "Ramos Mejía".to_string(),
        "Calle Secundaria 456".to_string(),
        "Salud".to_string(),
        "Consultas Médicas".to_string(),
        "Evento".to_string(),
        String::new(),
    ]);

    Workbook { sheets: vec![sheet] }
}

/// Keep socios whose fecha_alta falls inside the (inclusive) date range
pub fn filtrar_por_fechas(
    socios: Vec<Socio>,
    desde: Option<NaiveDate>,
    hasta: Option<NaiveDate>,
) -> Vec<Socio> {
    socios
        .into_iter()
        .filter(|s| {
            let alta = s.fecha_alta.date_naive();
            desde.map_or(true, |d| alta >= d) && hasta.map_or(true, |h| alta <= h)
        })
        .collect()
}

fn socio_nombre(socio: &Socio) -> String {
    format!("{} {}", socio.nombre, socio.apellido)
}

fn sectores_labels(socio: &Socio) -> String {
    socio
        .sectores
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn conteo_por_sector(socios: &[Socio]) -> Vec<(String, usize)> {
    SECTORES
        .iter()
        .filter_map(|sector| {
            let cantidad = socios.iter().filter(|s| s.sectores.contains(sector)).count();
            if cantidad > 0 {
                Some((sector.label().to_string(), cantidad))
            } else {
                None
            }
        })
        .collect()
}

fn fmt_fecha(ts: DateTime<Utc>) -> String {
    ts.format("%d/%m/%Y").to_string()
}

fn fmt_naive(d: NaiveDate) -> String {
    d.format("%d/%m/%Y").to_string()
}

fn ultimo_dia_del_mes(d: NaiveDate) -> NaiveDate {
    let (anio, mes) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    NaiveDate::from_ymd_opt(anio, mes, 1)
        .expect("first of month always valid")
        .pred_opt()
        .expect("previous day always valid")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn socio(dni: &str, estado: EstadoSocio, sectores: Vec<Sector>, barrio: &str) -> Socio {
        Socio {
            id: dni.to_string(),
            nombre: "Juan".to_string(),
            apellido: "Pérez".to_string(),
            dni: dni.to_string(),
            email: None,
            telefono: None,
            fecha_nacimiento: None,
            barrio: Some(barrio.to_string()),
            direccion: None,
            etiquetas: Vec::new(),
            sectores,
            origen: None,
            observaciones: None,
            estado,
            grupo_familiar: None,
            fecha_alta: Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap(),
            ultima_actividad: Utc.with_ymd_and_hms(2026, 8, 3, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_workbook_sheets() {
        let socios = vec![
            socio("11111111", EstadoSocio::Activo, vec![Sector::Deportes], "Haedo"),
            socio(
                "22222222",
                EstadoSocio::Inactivo,
                vec![Sector::Deportes, Sector::Salud],
                "San Justo",
            ),
        ];
        let wb = ReportBuilder::workbook(&socios, &ReportFilters::default());

        let nombres: Vec<&str> = wb.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            nombres,
            vec!["Socios", "Estadísticas", "Por Estado", "Información"]
        );

        assert_eq!(wb.sheets[0].rows.len(), 2);
        assert_eq!(wb.sheets[0].rows[0][7], "03/08/2026");

        // Deportes: 2, Salud: 1
        assert!(wb.sheets[1]
            .rows
            .contains(&vec!["Deportes".to_string(), "2".to_string()]));
        assert!(wb.sheets[1]
            .rows
            .contains(&vec!["Salud".to_string(), "1".to_string()]));
    }

    #[test]
    fn test_workbook_echoes_filters() {
        let filtros = ReportFilters {
            estado: Some(EstadoSocio::Activo),
            barrio: Some("Haedo".to_string()),
            ..Default::default()
        };
        let wb = ReportBuilder::workbook(&[], &filtros);
        let info = &wb.sheets[3];
        assert!(info
            .rows
            .contains(&vec!["Filtros aplicados".to_string(), "Sí".to_string()]));
        assert!(info
            .rows
            .contains(&vec!["Estado".to_string(), "Activo".to_string()]));
    }

    #[test]
    fn test_document_pagination() {
        let socios: Vec<Socio> = (0..60)
            .map(|i| {
                socio(
                    &format!("{:08}", i),
                    EstadoSocio::Activo,
                    vec![Sector::Cultural],
                    "Haedo",
                )
            })
            .collect();

        let doc = ReportBuilder::documento(&socios, &ReportFilters::default());
        assert_eq!(doc.header.total, 60);
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.pages[0].rows.len(), 25);
        assert_eq!(doc.pages[2].rows.len(), 10);
        assert_eq!(doc.pages[2].number, 3);
        assert_eq!(
            doc.sector_summary.rows,
            vec![vec!["Cultural".to_string(), "60".to_string()]]
        );
    }

    #[test]
    fn test_reporte_mensual() {
        let mut fuera = socio("11111111", EstadoSocio::Activo, vec![Sector::Salud], "Haedo");
        fuera.fecha_alta = Utc.with_ymd_and_hms(2026, 7, 15, 0, 0, 0).unwrap();
        let dentro = socio(
            "22222222",
            EstadoSocio::Activo,
            vec![Sector::Deportes],
            "San Justo",
        );

        let hoy = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let reporte = ReportBuilder::mensual(&[fuera, dentro], hoy);

        assert_eq!(reporte.total_nuevos, 1);
        assert_eq!(reporte.por_sector.get("Deportes"), Some(&1));
        assert_eq!(reporte.por_barrio.get("San Justo"), Some(&1));
        assert_eq!(reporte.fecha_inicio, NaiveDate::from_ymd_opt(2026, 8, 1).unwrap());
        assert_eq!(reporte.fecha_fin, NaiveDate::from_ymd_opt(2026, 8, 31).unwrap());
    }

    #[test]
    fn test_plantilla() {
        let wb = plantilla_importacion();
        assert_eq!(wb.sheets.len(), 1);
        let hoja = &wb.sheets[0];
        assert_eq!(hoja.name, "Socios");
        assert_eq!(hoja.header.len(), COLUMNAS.len());
        assert_eq!(hoja.rows.len(), 2);
        assert_eq!(hoja.rows[0][2], "12345678");
    }
}
