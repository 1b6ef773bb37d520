/// Comunicacion repository backed by the shared SQLite pool
use crate::{
    comunicaciones::{
        Comunicacion, ComunicacionStats, ComunicacionUpdate, CreadoPor, EstadisticasEnvio,
        EstadoComunicacion, FiltrosDestinatarios, NuevaComunicacion, TipoComunicacion,
    },
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::collections::BTreeMap;
use uuid::Uuid;

const COLUMNS: &str = "id, titulo, tipo, contenido, filtros, creado_por, estado, estadisticas, \
     fecha_creacion, fecha_actualizacion, fecha_envio";

#[derive(Clone)]
pub struct ComunicacionRepository {
    db: SqlitePool,
}

impl ComunicacionRepository {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a draft with zeroed delivery counters
    pub async fn create(
        &self,
        nueva: NuevaComunicacion,
        creado_por: CreadoPor,
    ) -> AppResult<Comunicacion> {
        let comunicacion = Comunicacion {
            id: Uuid::new_v4().to_string(),
            titulo: nueva.titulo,
            tipo: nueva.tipo,
            contenido: nueva.contenido,
            filtros: nueva.filtros,
            creado_por,
            estado: EstadoComunicacion::Borrador,
            estadisticas: EstadisticasEnvio::default(),
            fecha_creacion: Utc::now(),
            fecha_actualizacion: None,
            fecha_envio: None,
        };

        sqlx::query(
            "INSERT INTO comunicaciones (id, titulo, tipo, contenido, filtros, creado_por, \
             estado, estadisticas, fecha_creacion, fecha_actualizacion, fecha_envio) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&comunicacion.id)
        .bind(&comunicacion.titulo)
        .bind(comunicacion.tipo.as_str())
        .bind(&comunicacion.contenido)
        .bind(to_json(&comunicacion.filtros)?)
        .bind(to_json(&comunicacion.creado_por)?)
        .bind(comunicacion.estado.as_str())
        .bind(to_json(&comunicacion.estadisticas)?)
        .bind(comunicacion.fecha_creacion)
        .bind(comunicacion.fecha_actualizacion)
        .bind(comunicacion.fecha_envio)
        .execute(&self.db)
        .await?;

        Ok(comunicacion)
    }

    /// Recent communications, newest first
    pub async fn list(&self, limit: i64) -> AppResult<Vec<Comunicacion>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comunicaciones ORDER BY fecha_creacion DESC LIMIT ?1",
            COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_comunicacion).collect()
    }

    pub async fn get(&self, id: &str) -> AppResult<Option<Comunicacion>> {
        let row = sqlx::query(&format!("SELECT {} FROM comunicaciones WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(row_to_comunicacion).transpose()
    }

    /// Communications of one type, newest first
    pub async fn by_tipo(&self, tipo: TipoComunicacion) -> AppResult<Vec<Comunicacion>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM comunicaciones WHERE tipo = ?1 ORDER BY fecha_creacion DESC",
            COLUMNS
        ))
        .bind(tipo.as_str())
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(row_to_comunicacion).collect()
    }

    /// Update with merge semantics, stamping fecha_actualizacion
    pub async fn update(&self, id: &str, cambios: ComunicacionUpdate) -> AppResult<Comunicacion> {
        let mut comunicacion = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comunicación {} no encontrada", id)))?;

        if let Some(titulo) = cambios.titulo {
            comunicacion.titulo = titulo;
        }
        if let Some(tipo) = cambios.tipo {
            comunicacion.tipo = tipo;
        }
        if let Some(contenido) = cambios.contenido {
            comunicacion.contenido = contenido;
        }
        if let Some(filtros) = cambios.filtros {
            comunicacion.filtros = filtros;
        }
        if let Some(estado) = cambios.estado {
            comunicacion.estado = estado;
        }
        comunicacion.fecha_actualizacion = Some(Utc::now());

        sqlx::query(
            "UPDATE comunicaciones SET titulo = ?1, tipo = ?2, contenido = ?3, filtros = ?4, \
             estado = ?5, fecha_actualizacion = ?6 WHERE id = ?7",
        )
        .bind(&comunicacion.titulo)
        .bind(comunicacion.tipo.as_str())
        .bind(&comunicacion.contenido)
        .bind(to_json(&comunicacion.filtros)?)
        .bind(comunicacion.estado.as_str())
        .bind(comunicacion.fecha_actualizacion)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(comunicacion)
    }

    /// Record a delivery run: counters, fecha_envio and the enviado state
    pub async fn marcar_enviada(
        &self,
        id: &str,
        estadisticas: EstadisticasEnvio,
    ) -> AppResult<Comunicacion> {
        let mut comunicacion = self
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comunicación {} no encontrada", id)))?;

        comunicacion.estadisticas = estadisticas;
        comunicacion.estado = EstadoComunicacion::Enviado;
        comunicacion.fecha_envio = Some(Utc::now());

        sqlx::query(
            "UPDATE comunicaciones SET estadisticas = ?1, estado = ?2, fecha_envio = ?3 \
             WHERE id = ?4",
        )
        .bind(to_json(&comunicacion.estadisticas)?)
        .bind(comunicacion.estado.as_str())
        .bind(comunicacion.fecha_envio)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(comunicacion)
    }

    /// Hard delete
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM comunicaciones WHERE id = ?1")
            .bind(id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comunicación {} no encontrada", id)));
        }

        Ok(())
    }

    /// Aggregate figures over the recent window
    pub async fn stats(&self, limit: i64) -> AppResult<ComunicacionStats> {
        let comunicaciones = self.list(limit).await?;

        let mut por_tipo: BTreeMap<String, usize> = BTreeMap::new();
        for c in &comunicaciones {
            *por_tipo.entry(c.tipo.as_str().to_string()).or_default() += 1;
        }

        Ok(ComunicacionStats {
            total: comunicaciones.len(),
            enviadas: comunicaciones
                .iter()
                .filter(|c| c.estado == EstadoComunicacion::Enviado)
                .count(),
            borradores: comunicaciones
                .iter()
                .filter(|c| c.estado == EstadoComunicacion::Borrador)
                .count(),
            por_tipo,
        })
    }
}

fn row_to_comunicacion(row: &SqliteRow) -> AppResult<Comunicacion> {
    let tipo_raw: String = row.get("tipo");
    let tipo = TipoComunicacion::parse(&tipo_raw)
        .ok_or_else(|| AppError::Internal(format!("Invalid tipo: {}", tipo_raw)))?;

    let estado_raw: String = row.get("estado");
    let estado = EstadoComunicacion::parse(&estado_raw)
        .ok_or_else(|| AppError::Internal(format!("Invalid estado: {}", estado_raw)))?;

    let filtros: FiltrosDestinatarios = from_json(row.get("filtros"))?;
    let creado_por: CreadoPor = from_json(row.get("creado_por"))?;
    let estadisticas: EstadisticasEnvio = from_json(row.get("estadisticas"))?;

    let fecha_creacion: DateTime<Utc> = row.get("fecha_creacion");
    let fecha_actualizacion: Option<DateTime<Utc>> = row.get("fecha_actualizacion");
    let fecha_envio: Option<DateTime<Utc>> = row.get("fecha_envio");

    Ok(Comunicacion {
        id: row.get("id"),
        titulo: row.get("titulo"),
        tipo,
        contenido: row.get("contenido"),
        filtros,
        creado_por,
        estado,
        estadisticas,
        fecha_creacion,
        fecha_actualizacion,
        fecha_envio,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(format!("JSON encoding error: {}", e)))
}

fn from_json<T: serde::de::DeserializeOwned + Default>(raw: String) -> AppResult<T> {
    if raw.is_empty() || raw == "{}" {
        return Ok(T::default());
    }
    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("JSON decoding error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socios::Sector;

    async fn memory_repo() -> ComunicacionRepository {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE comunicaciones (
                id TEXT PRIMARY KEY,
                titulo TEXT NOT NULL,
                tipo TEXT NOT NULL,
                contenido TEXT NOT NULL,
                filtros TEXT NOT NULL DEFAULT '{}',
                creado_por TEXT NOT NULL DEFAULT '{}',
                estado TEXT NOT NULL DEFAULT 'borrador',
                estadisticas TEXT NOT NULL DEFAULT '{}',
                fecha_creacion TEXT NOT NULL,
                fecha_actualizacion TEXT,
                fecha_envio TEXT
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        ComunicacionRepository::new(db)
    }

    fn nueva(titulo: &str, tipo: TipoComunicacion) -> NuevaComunicacion {
        NuevaComunicacion {
            titulo: titulo.to_string(),
            tipo,
            contenido: "Contenido de prueba".to_string(),
            filtros: FiltrosDestinatarios {
                sector: Some(Sector::Deportes),
                ..Default::default()
            },
        }
    }

    fn creadora() -> CreadoPor {
        CreadoPor {
            id: Some("u1".to_string()),
            email: Some("ana@opm.org".to_string()),
            nombre: Some("Ana Prueba".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let repo = memory_repo().await;
        let c = repo
            .create(nueva("Torneo de fútbol", TipoComunicacion::Anuncio), creadora())
            .await
            .unwrap();

        assert_eq!(c.estado, EstadoComunicacion::Borrador);
        assert_eq!(c.estadisticas, EstadisticasEnvio::default());

        let fetched = repo.get(&c.id).await.unwrap().unwrap();
        assert_eq!(fetched.titulo, "Torneo de fútbol");
        assert_eq!(fetched.filtros.sector, Some(Sector::Deportes));
        assert_eq!(fetched.creado_por.email.as_deref(), Some("ana@opm.org"));
    }

    #[tokio::test]
    async fn test_update_and_mark_sent() {
        let repo = memory_repo().await;
        let c = repo
            .create(nueva("Boletín", TipoComunicacion::Newsletter), creadora())
            .await
            .unwrap();

        let updated = repo
            .update(
                &c.id,
                ComunicacionUpdate {
                    titulo: Some("Boletín mensual".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.titulo, "Boletín mensual");
        assert!(updated.fecha_actualizacion.is_some());

        let sent = repo
            .marcar_enviada(
                &c.id,
                EstadisticasEnvio {
                    total_enviados: 120,
                    exitosos: 118,
                    fallidos: 2,
                    pendientes: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.estado, EstadoComunicacion::Enviado);
        assert_eq!(sent.estadisticas.exitosos, 118);
        assert!(sent.fecha_envio.is_some());
    }

    #[tokio::test]
    async fn test_by_tipo_and_stats() {
        let repo = memory_repo().await;
        repo.create(nueva("A", TipoComunicacion::Anuncio), creadora())
            .await
            .unwrap();
        repo.create(nueva("B", TipoComunicacion::Anuncio), creadora())
            .await
            .unwrap();
        let c = repo
            .create(nueva("C", TipoComunicacion::Recordatorio), creadora())
            .await
            .unwrap();
        repo.marcar_enviada(&c.id, EstadisticasEnvio::default())
            .await
            .unwrap();

        assert_eq!(repo.by_tipo(TipoComunicacion::Anuncio).await.unwrap().len(), 2);

        let stats = repo.stats(1000).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.enviadas, 1);
        assert_eq!(stats.borradores, 2);
        assert_eq!(stats.por_tipo.get("anuncio"), Some(&2));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = memory_repo().await;
        let c = repo
            .create(nueva("Efímera", TipoComunicacion::Promocion), creadora())
            .await
            .unwrap();

        repo.delete(&c.id).await.unwrap();
        assert!(repo.get(&c.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&c.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
