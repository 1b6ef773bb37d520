/// Bulk import of socios from a tabular workbook
///
/// Rows are validated independently against the fixed column schema and then
/// imported strictly sequentially, one create at a time. Rows that fail keep
/// their reason in the ledger; rows already created are never rolled back.
use crate::{
    report::{Sheet, Workbook},
    socios::{NuevoSocio, Sector, SocioRepository, BARRIOS, ORIGENES_CONTACTO},
};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

/// Fixed import column schema
pub const COLUMNAS: &[&str] = &[
    "Nombre",
    "Apellido",
    "DNI",
    "Email",
    "Telefono",
    "Fecha_Nacimiento",
    "Barrio",
    "Direccion",
    "Sectores",
    "Etiquetas",
    "Origen_Contacto",
    "Observaciones",
];

/// Sheet the importer looks for before falling back to the first one
const HOJA_SOCIOS: &str = "Socios";

/// A rejected row with its reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRejection {
    /// Spreadsheet row number (header is row 1)
    pub fila: usize,
    pub nombre: Option<String>,
    pub dni: Option<String>,
    pub motivo: String,
}

/// Per-row accepted/rejected ledger of one import run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub exitosos: usize,
    pub rechazados: usize,
    pub errores: Vec<ImportRejection>,
    /// Ids of the socios created by this run
    pub socios_creados: Vec<String>,
}

/// A parsed, not yet validated row
#[derive(Debug, Clone)]
struct Fila {
    numero: usize,
    nuevo: NuevoSocio,
}

pub struct SocioImporter {
    repo: SocioRepository,
}

impl SocioImporter {
    pub fn new(repo: SocioRepository) -> Self {
        Self { repo }
    }

    /// Run a full import: pick the data sheet, validate every row
    /// independently, then create the valid ones sequentially. Duplicate DNIs
    /// (against the store or an earlier row of the same batch) are rejected
    /// before anything for that row is persisted.
    pub async fn importar(&self, workbook: &Workbook) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();

        let sheet = match workbook.sheet_named_or_first(HOJA_SOCIOS) {
            Some(sheet) => sheet,
            None => {
                outcome.errores.push(ImportRejection {
                    fila: 0,
                    nombre: None,
                    dni: None,
                    motivo: "El archivo no contiene hojas".to_string(),
                });
                outcome.rechazados = 1;
                return outcome;
            }
        };

        let (filas, mut errores) = parse_sheet(sheet);

        for fila in filas {
            match self.importar_fila(&fila).await {
                Ok(id) => {
                    outcome.exitosos += 1;
                    outcome.socios_creados.push(id);
                }
                Err(motivo) => errores.push(ImportRejection {
                    fila: fila.numero,
                    nombre: Some(format!("{} {}", fila.nuevo.nombre, fila.nuevo.apellido)),
                    dni: Some(fila.nuevo.dni.clone()),
                    motivo,
                }),
            }
        }

        errores.sort_by_key(|e| e.fila);
        outcome.rechazados = errores.len();
        outcome.errores = errores;
        outcome
    }

    async fn importar_fila(&self, fila: &Fila) -> Result<String, String> {
        match self.repo.find_by_dni(&fila.nuevo.dni).await {
            Ok(Some(_)) => return Err("DNI ya existe en el sistema".to_string()),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Import row {}: DNI lookup failed: {}", fila.numero, e);
                return Err("No se pudo verificar el DNI".to_string());
            }
        }

        self.repo
            .create(fila.nuevo.clone())
            .await
            .map(|socio| socio.id)
            .map_err(|e| e.to_string())
    }
}

/// Validate and convert a sheet into candidate rows plus rejections.
/// Row numbers are 1-based with the header as row 1.
fn parse_sheet(sheet: &Sheet) -> (Vec<Fila>, Vec<ImportRejection>) {
    let mut filas = Vec::new();
    let mut errores = Vec::new();

    let index = |col: &str| sheet.header.iter().position(|h| h == col);
    let columnas: Vec<Option<usize>> = COLUMNAS.iter().map(|c| index(c)).collect();
    let celda = |row: &[String], col: usize| -> String {
        columnas[col]
            .and_then(|i| row.get(i))
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };

    for (i, row) in sheet.rows.iter().enumerate() {
        let numero = i + 2;
        let mut motivos: Vec<String> = Vec::new();

        let nombre = celda(row, 0);
        let apellido = celda(row, 1);
        let dni_raw = celda(row, 2);
        let email = celda(row, 3);
        let telefono = celda(row, 4);
        let fecha_nacimiento = celda(row, 5);
        let barrio = celda(row, 6);
        let direccion = celda(row, 7);
        let sectores_raw = celda(row, 8);
        let etiquetas_raw = celda(row, 9);
        let origen = celda(row, 10);
        let observaciones = celda(row, 11);

        if nombre.is_empty() {
            motivos.push("Nombre es obligatorio".to_string());
        }
        if apellido.is_empty() {
            motivos.push("Apellido es obligatorio".to_string());
        }
        if dni_raw.is_empty() {
            motivos.push("DNI es obligatorio".to_string());
        }
        if email.is_empty() {
            motivos.push("Email es obligatorio".to_string());
        }
        if telefono.is_empty() {
            motivos.push("Teléfono es obligatorio".to_string());
        }

        let dni: String = dni_raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if !dni_raw.is_empty() && (dni.len() < 7 || dni.len() > 8) {
            motivos.push("DNI debe tener entre 7 y 8 dígitos".to_string());
        }

        if !email.is_empty() && !ValidateEmail::validate_email(&email) {
            motivos.push("Email no tiene formato válido".to_string());
        }

        if !barrio.is_empty() && !BARRIOS.contains(&barrio.as_str()) {
            motivos.push(format!("Barrio \"{}\" no es válido", barrio));
        }

        let mut sectores: Vec<Sector> = Vec::new();
        if !sectores_raw.is_empty() {
            let mut invalidos: Vec<String> = Vec::new();
            for label in sectores_raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                match Sector::parse_label(label) {
                    Some(sector) => {
                        if !sectores.contains(&sector) {
                            sectores.push(sector);
                        }
                    }
                    None => invalidos.push(label.to_string()),
                }
            }
            if !invalidos.is_empty() {
                motivos.push(format!("Sectores inválidos: {}", invalidos.join(", ")));
            }
        }

        if !origen.is_empty() && !ORIGENES_CONTACTO.contains(&origen.as_str()) {
            motivos.push(format!("Origen de contacto \"{}\" no es válido", origen));
        }

        if !motivos.is_empty() {
            errores.push(ImportRejection {
                fila: numero,
                nombre: if nombre.is_empty() && apellido.is_empty() {
                    None
                } else {
                    Some(format!("{} {}", nombre, apellido))
                },
                dni: if dni.is_empty() { None } else { Some(dni) },
                motivo: motivos.join("; "),
            });
            continue;
        }

        // Unknown tags are dropped silently; the repository re-checks the
        // subset invariant against the sector set on create.
        let conocidas: Vec<&str> = crate::socios::SECTORES
            .iter()
            .flat_map(|s| s.etiquetas().iter().copied())
            .collect();
        let etiquetas: Vec<String> = etiquetas_raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty() && conocidas.contains(s))
            .map(str::to_string)
            .collect();

        filas.push(Fila {
            numero,
            nuevo: NuevoSocio {
                nombre,
                apellido,
                dni,
                email: Some(email),
                telefono: Some(telefono.chars().filter(|c| c.is_ascii_digit()).collect()),
                fecha_nacimiento: non_empty(fecha_nacimiento),
                barrio: non_empty(barrio),
                direccion: non_empty(direccion),
                sectores,
                etiquetas,
                origen: non_empty(origen),
                observaciones: non_empty(observaciones),
                grupo_familiar: None,
            },
        });
    }

    (filas, errores)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
