//! Command-line surface.
//!
//! Global flags fall back to `ROLLCALL_*` environment variables, then to the
//! optional TOML file, then to built-in defaults.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use rollcall_core::{parse_date, AttendanceStatus, ConfigOverrides};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rollcall", version, about = "Classroom attendance from photos")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "ROLLCALL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the SQLite database.
    #[arg(long, env = "ROLLCALL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Root directory for stored photos.
    #[arg(long, env = "ROLLCALL_UPLOADS_DIR", global = true)]
    pub uploads_dir: Option<PathBuf>,

    #[arg(long, env = "ROLLCALL_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Absolute directory for rolling log files.
    #[arg(long, env = "ROLLCALL_LOG_DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Seed for the simulated recognizer.
    #[arg(long, env = "ROLLCALL_RECOGNITION_SEED", global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            data_dir: self.data_dir.clone(),
            uploads_dir: self.uploads_dir.clone(),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            recognition_seed: self.seed,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List students, optionally only one class.
    Students {
        #[arg(long)]
        class_id: Option<String>,
    },
    /// Enroll a student with a reference photo.
    AddStudent(AddStudentArgs),
    DeleteStudent { student_id: String },
    /// List classes.
    Classes,
    AddClass {
        #[arg(long)]
        name: String,
    },
    /// Delete a class nothing references any more.
    DeleteClass { class_id: String },
    /// Recognize a classroom photo and record the whole roster.
    TakeAttendance(TakeAttendanceArgs),
    /// Set one student's status, overriding earlier results.
    ManualAttendance(ManualAttendanceArgs),
    /// Records of one class on one date, with student names.
    AttendanceReport {
        #[arg(long)]
        class_id: String,
        #[arg(long, value_parser = date_arg)]
        date: NaiveDate,
    },
    /// Every record of one student.
    StudentReport {
        #[arg(long)]
        student_id: String,
    },
}

/// Photo given inline as base64 or as an image file.
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct PhotoArgs {
    /// Base64 image, optionally as a `data:` URL.
    #[arg(long)]
    pub photo: Option<String>,
    #[arg(long)]
    pub photo_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoInput {
    Base64(String),
    File(PathBuf),
}

impl PhotoArgs {
    pub fn input(&self) -> Option<PhotoInput> {
        match (&self.photo, &self.photo_file) {
            (Some(payload), _) => Some(PhotoInput::Base64(payload.clone())),
            (None, Some(path)) => Some(PhotoInput::File(path.clone())),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Args)]
pub struct AddStudentArgs {
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub class_id: String,
    #[command(flatten)]
    pub photo: PhotoArgs,
}

#[derive(Debug, Args)]
pub struct TakeAttendanceArgs {
    #[arg(long)]
    pub class_id: String,
    /// Defaults to today's local date.
    #[arg(long, value_parser = date_arg)]
    pub date: Option<NaiveDate>,
    #[command(flatten)]
    pub photo: PhotoArgs,
}

#[derive(Debug, Args)]
pub struct ManualAttendanceArgs {
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub class_id: String,
    #[arg(long, value_parser = date_arg)]
    pub date: NaiveDate,
    #[arg(long, value_enum, default_value_t = StatusArg::Present)]
    pub status: StatusArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Present,
    Absent,
}

impl From<StatusArg> for AttendanceStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Present => AttendanceStatus::Present,
            StatusArg::Absent => AttendanceStatus::Absent,
        }
    }
}

fn date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value).map_err(|err| err.to_string())
}
