#[cfg(feature = "binary")]
mod inner {
    use std::sync::Mutex;

    use once_cell::sync::OnceCell;
    use slog::Drain;
    use slog_scope::GlobalLoggerGuard;

    static LOGGER: OnceCell<GlobalLoggerGuard> = OnceCell::new();

    pub fn for_tests() {
        LOGGER.get_or_init(|| {
            let drain = slog_term::TermDecorator::new()
                .stdout()
                .force_color()
                .build();
            let drain = slog_term::CompactFormat::new(drain).build();
            let drain = Mutex::new(drain).fuse();
            let logger = slog::Logger::root(drain, slog::o!());
            slog_scope::set_global_logger(logger)
        });
    }
}

#[cfg(not(feature = "binary"))]
mod inner {
    pub fn for_tests() {}
}

pub use inner::for_tests;

#[cfg(test)]
mod test {
    #[test]
    fn prelude_is_usable() {
        super::for_tests();
        let logger = crate::prelude::logger();
        crate::prelude::scope(&logger, || {
            crate::prelude::info!("hello");
        });
    }
}
