//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `careline_core` linkage and the configured database.
//! - Keep output deterministic, one `key=value` pair per line.

use careline_core::db::migrations::current_user_version;
use careline_core::model::doctor::Doctor;
use careline_core::model::studio::DoctorStudio;
use careline_core::model::user_info::UserInfo;
use careline_core::{
    core_version, init_from_config, open_db, ping, CoreConfig, Entity, SqliteSequenceAllocator,
    User,
};
use log::info;
use std::error::Error;
use std::process::ExitCode;

const SEQUENCE_NAMES: [&str; 4] = [
    User::TABLE,
    Doctor::TABLE,
    DoctorStudio::TABLE,
    UserInfo::TABLE,
];

fn main() -> ExitCode {
    println!("careline_core ping={}", ping());
    println!("careline_core version={}", core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if config.log_dir.is_some() {
        init_from_config(&config)?;
    }

    let conn = open_db(&config.db_path)?;
    println!("db_path={}", config.db_path.display());
    println!("schema_version={}", current_user_version(&conn)?);

    let sequences = SqliteSequenceAllocator::new(&conn);
    for name in SEQUENCE_NAMES {
        println!("sequence.{name}={}", sequences.current_value(name)?);
    }

    info!("event=cli_probe module=cli status=ok");
    Ok(())
}
