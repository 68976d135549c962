use log::{Level, LevelFilter, Log, Metadata, Record};

/// Plain stderr sink for the `log` facade.
struct StderrLogger
{
    level: LevelFilter,
}

impl Log for StderrLogger
{
    fn enabled(&self, metadata: &Metadata) -> bool
    {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record)
    {
        if !self.enabled(record.metadata())
        {
            return;
        }

        match record.level()
        {
            Level::Error => eprintln!("error: {}", record.args()),
            Level::Warn  => eprintln!("warning: {}", record.args()),
            level        => eprintln!("[{}] {}", level, record.args()),
        }
    }

    fn flush(&self) {}
}

/// `verbosity` counts `-v` flags: warnings only, then info, debug, trace.
pub fn init(verbosity: u8)
{
    let level = match verbosity
    {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if log::set_boxed_logger(Box::new(StderrLogger { level })).is_ok()
    {
        log::set_max_level(level);
    }
}
