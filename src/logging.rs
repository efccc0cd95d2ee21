use log::{warn, LevelFilter};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Writes every log line to stderr and to the launcher log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr is best effort, the file is what gets reported
        let _ = io::stderr().write_all(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        self.file.flush()
    }
}

/// Initialize logging to stderr and `log_file`.
///
/// Defaults to `Info`; `RUST_LOG` overrides it (e.g. `RUST_LOG=debug` shows
/// download progress).
pub fn init(log_file: &Path) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
                record.level(),
                record.args()
            )
        });

    let open_result = OpenOptions::new().create(true).append(true).open(log_file);
    match open_result {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
            builder.init();
        }
        Err(e) => {
            builder.target(env_logger::Target::Stderr);
            builder.init();
            warn!("Could not open log file {}: {}", log_file.display(), e);
        }
    }
}
