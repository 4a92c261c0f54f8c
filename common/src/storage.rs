use std::{
    fs,
    io::{self, Write},
    path::Path,
};

/// Capacidad de almacenamiento que usan los workers (y el master para
/// expandir patrones de entrada). Las ubicaciones son rutas.
pub trait Storage: Send + Sync {
    /// Escribe `bytes` en `location`. Los lectores ven el archivo completo o
    /// nada: nunca una escritura a medias.
    fn write(&self, location: &str, bytes: &[u8]) -> io::Result<()>;

    fn read(&self, location: &str) -> io::Result<Vec<u8>>;

    /// Ubicaciones que hacen match con `pattern` (glob), ordenadas.
    fn list(&self, pattern: &str) -> io::Result<Vec<String>>;
}

/// Storage sobre el filesystem local (o compartido, ej. un volumen montado
/// en todos los contenedores).
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }
}

impl Storage for LocalStorage {
    fn write(&self, location: &str, bytes: &[u8]) -> io::Result<()> {
        let path = Path::new(location);

        // Crear carpeta de salida si hace falta
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // temp único por escritura: dos intentos de la misma tarea no comparten temp
        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("out");
        let tmp_path = path.with_file_name(format!(
            ".{}.tmp-{}",
            file_name,
            uuid::Uuid::new_v4().simple()
        ));

        let result = (|| {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp_path, path)
        })();

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        result
    }

    fn read(&self, location: &str) -> io::Result<Vec<u8>> {
        fs::read(location)
    }

    fn list(&self, pattern: &str) -> io::Result<Vec<String>> {
        let entries = glob::glob(pattern).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("patrón inválido {}: {e}", pattern),
            )
        })?;

        let mut out = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| e.into_error())?;
            if path.is_file() {
                out.push(path.to_string_lossy().to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}
