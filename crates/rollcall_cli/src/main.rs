//! `rollcall` command-line entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the store.
//! - Dispatch one subcommand and print its JSON envelope on stdout.
//!
//! # Invariants
//! - Exit status is non-zero exactly when the envelope reports failure.

mod api;
mod cli;

use api::{Api, Envelope};
use clap::Parser;
use cli::{Cli, Command};
use log::info;
use rollcall_core::db::open_db;
use rollcall_core::{init_logging, AppConfig, PhotoStore, SimulatedRecognizer};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let envelope = run(cli);
    println!("{}", envelope.to_json());
    if envelope.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: Cli) -> Envelope {
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.overrides()),
        Err(err) => return Envelope::failure(err.to_string()),
    };

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            return Envelope::failure(format!("logging init failed: {err}"));
        }
    }
    info!(
        "event=cli_start module=cli status=ok version={} data_dir={} uploads_dir={}",
        rollcall_core::core_version(),
        config.data_dir.display(),
        config.uploads_dir.display()
    );

    let conn = match open_db(config.database_path()) {
        Ok(conn) => conn,
        Err(err) => return Envelope::failure(format!("database open failed: {err}")),
    };
    let photos = PhotoStore::new(&config.uploads_dir);
    let recognizer = match config.recognition_seed {
        Some(seed) => SimulatedRecognizer::with_seed(seed),
        None => SimulatedRecognizer::new(),
    };
    let api = Api::new(&conn, &photos, &recognizer);

    dispatch(&api, cli.command)
}

fn dispatch(api: &Api<'_>, command: Command) -> Envelope {
    match command {
        Command::Students { class_id } => api.list_students(class_id.as_deref()),
        Command::AddStudent(args) => match args.photo.input() {
            Some(photo) => api.add_student(&args.student_id, &args.name, &args.class_id, &photo),
            None => Envelope::failure("Missing required fields"),
        },
        Command::DeleteStudent { student_id } => api.delete_student(&student_id),
        Command::Classes => api.list_classes(),
        Command::AddClass { name } => api.add_class(&name),
        Command::DeleteClass { class_id } => api.delete_class(&class_id),
        Command::TakeAttendance(args) => {
            let date = args
                .date
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            match args.photo.input() {
                Some(photo) => api.take_attendance(&args.class_id, date, &photo),
                None => Envelope::failure("Missing required fields"),
            }
        }
        Command::ManualAttendance(args) => api.manual_attendance(
            &args.student_id,
            &args.class_id,
            args.date,
            args.status.into(),
        ),
        Command::AttendanceReport { class_id, date } => api.attendance_report(&class_id, date),
        Command::StudentReport { student_id } => api.student_report(&student_id),
    }
}
