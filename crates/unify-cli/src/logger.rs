//! Grounded in `sqruff-cli-lib::logger`: a single `fern` dispatch to
//! stderr, level controlled by an env var (renamed from the teacher's
//! `SQRUFF_LOG` to `UNIFY_LOG`, spec §6.2/SPEC_FULL §3).

pub(crate) fn init() -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| out.finish(format_args!("[{}] {}", record.level(), message)))
        .level(
            std::env::var("UNIFY_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(log::LevelFilter::Info),
        )
        .chain(std::io::stderr())
        .apply()
}
