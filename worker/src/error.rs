use std::io;
use thiserror::Error;

/// Formas en que termina un loop de worker (o un intento de tarea).
#[derive(Error, Debug)]
pub enum WorkerError {
    /// El coordinador no respondió tras los reintentos. Fatal para el worker;
    /// el sweep del master reasigna lo que tuviera en vuelo.
    #[error("coordinador inalcanzable en {endpoint}: {reason}")]
    CoordinatorUnreachable { endpoint: String, reason: String },

    /// El coordinador respondió algo que no sabemos interpretar.
    #[error("respuesta inesperada del coordinador: {0}")]
    Protocol(String),

    /// Falló la función map/reduce o su entrada (ej. archivo ilegible).
    #[error("fallo de la aplicación en {task}: {reason}")]
    Application { task: String, reason: String },

    #[error("error de almacenamiento en {location}: {source}")]
    Storage {
        location: String,
        #[source]
        source: io::Error,
    },

    /// El hilo de ejecución de la tarea entró en pánico o se canceló.
    #[error("tarea abortada: {0}")]
    Aborted(String),
}

impl WorkerError {
    pub fn storage(location: &str, source: io::Error) -> Self {
        Self::Storage {
            location: location.to_string(),
            source,
        }
    }

    pub fn is_fatal_for_process(&self) -> bool {
        matches!(self, Self::CoordinatorUnreachable { .. } | Self::Protocol(_))
    }
}
