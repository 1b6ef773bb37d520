/// Socio repository backed by the shared SQLite pool
///
/// Sector and tag sets are stored as JSON arrays; the sector containment
/// filter matches against the serialized array.
use crate::{
    error::{AppError, AppResult},
    socios::{
        retain_valid_etiquetas, EstadoSocio, NuevoSocio, Sector, Socio, SocioEstadisticas,
        SocioFilters, SocioUpdate,
    },
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const SOCIO_COLUMNS: &str = "id, nombre, apellido, dni, email, telefono, fecha_nacimiento, \
     barrio, direccion, sectores, etiquetas, origen, observaciones, estado, grupo_familiar, \
     fecha_alta, ultima_actividad";

#[derive(Clone)]
pub struct SocioRepository {
    db: SqlitePool,
}

impl SocioRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List socios, optionally filtered, newest first
    pub async fn list(&self, filters: &SocioFilters) -> AppResult<Vec<Socio>> {
        let mut sql = format!("SELECT {} FROM socios WHERE 1=1", SOCIO_COLUMNS);
        if filters.estado.is_some() {
            sql.push_str(" AND estado = ?");
        }
        if filters.barrio.is_some() {
            sql.push_str(" AND barrio = ?");
        }
        if filters.sector.is_some() {
            sql.push_str(" AND sectores LIKE ?");
        }
        sql.push_str(" ORDER BY fecha_alta DESC");

        let mut query = sqlx::query(&sql);
        if let Some(estado) = filters.estado {
            query = query.bind(estado.as_str());
        }
        if let Some(ref barrio) = filters.barrio {
            query = query.bind(barrio.clone());
        }
        if let Some(sector) = filters.sector {
            query = query.bind(format!("%\"{}\"%", sector.as_str()));
        }

        let rows = query.fetch_all(&self.db).await?;
        rows.iter().map(row_to_socio).collect()
    }

    /// Get a socio by id; None when missing
    pub async fn get(&self, id: &str) -> AppResult<Option<Socio>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM socios WHERE id = ?1",
            SOCIO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(row_to_socio).transpose()
    }

    /// Find a socio by DNI (the unique key)
    pub async fn find_by_dni(&self, dni: &str) -> AppResult<Option<Socio>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM socios WHERE dni = ?1 LIMIT 1",
            SOCIO_COLUMNS
        ))
        .bind(dni)
        .fetch_optional(&self.db)
        .await?;

        row.as_ref().map(row_to_socio).transpose()
    }

    /// Create a socio. The DNI must not be registered yet; the check runs
    /// before anything is persisted.
    pub async fn create(&self, nuevo: NuevoSocio) -> AppResult<Socio> {
        if nuevo.dni.trim().is_empty() {
            return Err(AppError::Validation("DNI es obligatorio".to_string()));
        }

        validar_grupo_familiar(&nuevo.grupo_familiar)?;

        if self.find_by_dni(&nuevo.dni).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "DNI {} ya existe en el sistema",
                nuevo.dni
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        let etiquetas = retain_valid_etiquetas(&nuevo.sectores, &nuevo.etiquetas);

        sqlx::query(
            "INSERT INTO socios (id, nombre, apellido, dni, email, telefono, fecha_nacimiento, \
             barrio, direccion, sectores, etiquetas, origen, observaciones, estado, \
             grupo_familiar, fecha_alta, ultima_actividad) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        )
        .bind(&id)
        .bind(&nuevo.nombre)
        .bind(&nuevo.apellido)
        .bind(&nuevo.dni)
        .bind(&nuevo.email)
        .bind(&nuevo.telefono)
        .bind(&nuevo.fecha_nacimiento)
        .bind(&nuevo.barrio)
        .bind(&nuevo.direccion)
        .bind(sectores_json(&nuevo.sectores)?)
        .bind(serde_json::to_string(&etiquetas).map_err(json_err)?)
        .bind(&nuevo.origen)
        .bind(&nuevo.observaciones)
        .bind(EstadoSocio::Activo.as_str())
        .bind(grupo_familiar_json(&nuevo.grupo_familiar)?)
        .bind(now)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(Socio {
            id,
            nombre: nuevo.nombre,
            apellido: nuevo.apellido,
            dni: nuevo.dni,
            email: nuevo.email,
            telefono: nuevo.telefono,
            fecha_nacimiento: nuevo.fecha_nacimiento,
            barrio: nuevo.barrio,
            direccion: nuevo.direccion,
            sectores: nuevo.sectores,
            etiquetas,
            origen: nuevo.origen,
            observaciones: nuevo.observaciones,
            estado: EstadoSocio::Activo,
            grupo_familiar: nuevo.grupo_familiar,
            fecha_alta: now,
            ultima_actividad: now,
        })
    }

    /// Update a socio with merge semantics, always stamping ultima_actividad
    pub async fn update(&self, id: &str, cambios: SocioUpdate) -> AppResult<Socio> {
        let mut socio = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Socio {} no encontrado", id)))?;

        if let Some(nombre) = cambios.nombre {
            socio.nombre = nombre;
        }
        if let Some(apellido) = cambios.apellido {
            socio.apellido = apellido;
        }
        if let Some(email) = cambios.email {
            socio.email = Some(email);
        }
        if let Some(telefono) = cambios.telefono {
            socio.telefono = Some(telefono);
        }
        if let Some(fecha_nacimiento) = cambios.fecha_nacimiento {
            socio.fecha_nacimiento = Some(fecha_nacimiento);
        }
        if let Some(barrio) = cambios.barrio {
            socio.barrio = Some(barrio);
        }
        if let Some(direccion) = cambios.direccion {
            socio.direccion = Some(direccion);
        }
        if let Some(sectores) = cambios.sectores {
            socio.sectores = sectores;
        }
        if let Some(etiquetas) = cambios.etiquetas {
            socio.etiquetas = etiquetas;
        }
        if let Some(origen) = cambios.origen {
            socio.origen = Some(origen);
        }
        if let Some(observaciones) = cambios.observaciones {
            socio.observaciones = Some(observaciones);
        }
        if let Some(estado) = cambios.estado {
            socio.estado = estado;
        }
        if let Some(grupo_familiar) = cambios.grupo_familiar {
            let grupo_familiar = Some(grupo_familiar);
            validar_grupo_familiar(&grupo_familiar)?;
            socio.grupo_familiar = grupo_familiar;
        }

        // Tags stay a subset of what the sector set implies
        socio.etiquetas = retain_valid_etiquetas(&socio.sectores, &socio.etiquetas);
        socio.ultima_actividad = Utc::now();

        sqlx::query(
            "UPDATE socios SET nombre = ?1, apellido = ?2, email = ?3, telefono = ?4, \
             fecha_nacimiento = ?5, barrio = ?6, direccion = ?7, sectores = ?8, etiquetas = ?9, \
             origen = ?10, observaciones = ?11, estado = ?12, grupo_familiar = ?13, \
             ultima_actividad = ?14 WHERE id = ?15",
        )
        .bind(&socio.nombre)
        .bind(&socio.apellido)
        .bind(&socio.email)
        .bind(&socio.telefono)
        .bind(&socio.fecha_nacimiento)
        .bind(&socio.barrio)
        .bind(&socio.direccion)
        .bind(sectores_json(&socio.sectores)?)
        .bind(serde_json::to_string(&socio.etiquetas).map_err(json_err)?)
        .bind(&socio.origen)
        .bind(&socio.observaciones)
        .bind(socio.estado.as_str())
        .bind(grupo_familiar_json(&socio.grupo_familiar)?)
        .bind(socio.ultima_actividad)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(socio)
    }

    /// Stamp ultima_actividad only. Failures are diagnostic-only and never
    /// interrupt the caller's primary operation.
    pub async fn touch_actividad(&self, id: &str) {
        let result = sqlx::query("UPDATE socios SET ultima_actividad = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.db)
            .await;

        if let Err(e) = result {
            tracing::warn!("Failed to touch ultima_actividad for socio {}: {}", id, e);
        }
    }

    /// Hard delete
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM socios WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Socio {} no encontrado", id)));
        }

        Ok(())
    }

    /// Registry headcounts
    pub async fn estadisticas(&self) -> AppResult<SocioEstadisticas> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM socios")
            .fetch_one(&self.db)
            .await?;
        let activos: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM socios WHERE estado = 'activo'")
                .fetch_one(&self.db)
                .await?;
        let inactivos: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM socios WHERE estado = 'inactivo'")
                .fetch_one(&self.db)
                .await?;

        Ok(SocioEstadisticas {
            total,
            activos,
            inactivos,
        })
    }
}

fn row_to_socio(row: &SqliteRow) -> AppResult<Socio> {
    let sectores_raw: String = row.get("sectores");
    let sectores: Vec<String> = serde_json::from_str(&sectores_raw).map_err(json_err)?;
    let sectores: Vec<Sector> = sectores.iter().filter_map(|s| Sector::parse(s)).collect();

    let etiquetas_raw: String = row.get("etiquetas");
    let etiquetas: Vec<String> = serde_json::from_str(&etiquetas_raw).map_err(json_err)?;

    let grupo_familiar: Option<BTreeMap<String, String>> = row
        .try_get::<Option<String>, _>("grupo_familiar")
        .ok()
        .flatten()
        .and_then(|raw| serde_json::from_str(&raw).ok());

    let estado_raw: String = row.get("estado");
    let estado = EstadoSocio::parse(&estado_raw)
        .ok_or_else(|| AppError::Internal(format!("Invalid estado: {}", estado_raw)))?;

    let fecha_alta: DateTime<Utc> = row.get("fecha_alta");
    let ultima_actividad: DateTime<Utc> = row.get("ultima_actividad");

    Ok(Socio {
        id: row.get("id"),
        nombre: row.get("nombre"),
        apellido: row.get("apellido"),
        dni: row.get("dni"),
        email: row.get("email"),
        telefono: row.get("telefono"),
        fecha_nacimiento: row.get("fecha_nacimiento"),
        barrio: row.get("barrio"),
        direccion: row.get("direccion"),
        sectores,
        etiquetas,
        origen: row.get("origen"),
        observaciones: row.get("observaciones"),
        estado,
        grupo_familiar,
        fecha_alta,
        ultima_actividad,
    })
}

fn sectores_json(sectores: &[Sector]) -> AppResult<String> {
    let strs: Vec<&str> = sectores.iter().map(|s| s.as_str()).collect();
    serde_json::to_string(&strs).map_err(json_err)
}

fn grupo_familiar_json(grupo: &Option<BTreeMap<String, String>>) -> AppResult<Option<String>> {
    grupo
        .as_ref()
        .map(|g| serde_json::to_string(g).map_err(json_err))
        .transpose()
}

fn json_err(e: serde_json::Error) -> AppError {
    AppError::Internal(format!("JSON encoding error: {}", e))
}

/// Family-group keys must be known relationship labels
fn validar_grupo_familiar(grupo: &Option<BTreeMap<String, String>>) -> AppResult<()> {
    if let Some(grupo) = grupo {
        for vinculo in grupo.keys() {
            if !crate::socios::VINCULOS_FAMILIARES.contains(&vinculo.as_str()) {
                return Err(AppError::Validation(format!(
                    "Vínculo familiar \"{}\" no es válido",
                    vinculo
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn memory_pool() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE socios (
                id TEXT PRIMARY KEY,
                nombre TEXT NOT NULL,
                apellido TEXT NOT NULL,
                dni TEXT NOT NULL UNIQUE,
                email TEXT,
                telefono TEXT,
                fecha_nacimiento TEXT,
                barrio TEXT,
                direccion TEXT,
                sectores TEXT NOT NULL DEFAULT '[]',
                etiquetas TEXT NOT NULL DEFAULT '[]',
                origen TEXT,
                observaciones TEXT,
                estado TEXT NOT NULL DEFAULT 'activo',
                grupo_familiar TEXT,
                fecha_alta TEXT NOT NULL,
                ultima_actividad TEXT NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    fn nuevo(dni: &str) -> NuevoSocio {
        NuevoSocio {
            nombre: "Juan".to_string(),
            apellido: "Pérez".to_string(),
            dni: dni.to_string(),
            email: Some("juan.perez@email.com".to_string()),
            telefono: Some("1234567890".to_string()),
            barrio: Some("San Justo".to_string()),
            sectores: vec![Sector::Deportes],
            etiquetas: vec!["Fútbol".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let repo = SocioRepository::new(memory_pool().await);

        let socio = repo.create(nuevo("12345678")).await.unwrap();
        assert_eq!(socio.estado, EstadoSocio::Activo);
        assert_eq!(socio.etiquetas, vec!["Fútbol".to_string()]);

        let fetched = repo.get(&socio.id).await.unwrap().unwrap();
        assert_eq!(fetched.dni, "12345678");
        assert_eq!(fetched.sectores, vec![Sector::Deportes]);

        assert!(repo.get("desconocido").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_dni_rejected_before_insert() {
        let repo = SocioRepository::new(memory_pool().await);

        repo.create(nuevo("12345678")).await.unwrap();
        let err = repo.create(nuevo("12345678")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stats = repo.estadisticas().await.unwrap();
        assert_eq!(stats.total, 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_stamps_activity() {
        let repo = SocioRepository::new(memory_pool().await);
        let socio = repo.create(nuevo("12345678")).await.unwrap();

        let updated = repo
            .update(
                &socio.id,
                SocioUpdate {
                    barrio: Some("Ramos Mejía".to_string()),
                    estado: Some(EstadoSocio::BajaTemporal),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Untouched fields keep their value
        assert_eq!(updated.nombre, "Juan");
        assert_eq!(updated.barrio.as_deref(), Some("Ramos Mejía"));
        assert_eq!(updated.estado, EstadoSocio::BajaTemporal);
        assert!(updated.ultima_actividad >= socio.ultima_actividad);
    }

    #[tokio::test]
    async fn test_update_drops_tags_outside_sector_set() {
        let repo = SocioRepository::new(memory_pool().await);
        let socio = repo.create(nuevo("12345678")).await.unwrap();

        let updated = repo
            .update(
                &socio.id,
                SocioUpdate {
                    sectores: Some(vec![Sector::Salud]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // "Fútbol" is not implied by Salud
        assert!(updated.etiquetas.is_empty());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let repo = SocioRepository::new(memory_pool().await);
        repo.create(nuevo("11111111")).await.unwrap();

        let mut otra = nuevo("22222222");
        otra.barrio = Some("Haedo".to_string());
        otra.sectores = vec![Sector::Salud];
        otra.etiquetas = vec![];
        repo.create(otra).await.unwrap();

        let todos = repo.list(&SocioFilters::default()).await.unwrap();
        assert_eq!(todos.len(), 2);

        let deportistas = repo
            .list(&SocioFilters {
                sector: Some(Sector::Deportes),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(deportistas.len(), 1);
        assert_eq!(deportistas[0].dni, "11111111");

        let haedo = repo
            .list(&SocioFilters {
                barrio: Some("Haedo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(haedo.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_family_relationship_rejected() {
        let repo = SocioRepository::new(memory_pool().await);

        let mut con_grupo = nuevo("12345678");
        let mut grupo = BTreeMap::new();
        grupo.insert("Primo lejano".to_string(), "99999999".to_string());
        con_grupo.grupo_familiar = Some(grupo);

        let err = repo.create(con_grupo).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut valido = nuevo("12345678");
        let mut grupo = BTreeMap::new();
        grupo.insert("Madre".to_string(), "99999999".to_string());
        valido.grupo_familiar = Some(grupo);
        let socio = repo.create(valido).await.unwrap();
        assert_eq!(
            socio.grupo_familiar.unwrap().get("Madre").map(String::as_str),
            Some("99999999")
        );
    }

    #[tokio::test]
    async fn test_delete_is_hard() {
        let repo = SocioRepository::new(memory_pool().await);
        let socio = repo.create(nuevo("12345678")).await.unwrap();

        repo.delete(&socio.id).await.unwrap();
        assert!(repo.get(&socio.id).await.unwrap().is_none());

        let err = repo.delete(&socio.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
