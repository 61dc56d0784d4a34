// CLI module for argument parsing

use crate::services::export::default_export_dir;
use crate::services::intake::IntakeOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Photo Sorter - let an AI model group your photos into folders
///
/// Picks up the given photos (or the images inside the given directories),
/// asks Gemini to group them, prints the folders and optionally exports
/// chosen folders as zip archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "photo-sorter")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Photos or directories of photos to organize
    #[arg(required_unless_present_any = ["store_key", "forget_key"])]
    pub paths: Vec<PathBuf>,

    /// Export a folder by name after organizing; "all" exports every folder
    ///
    /// Can be specified multiple times.
    #[arg(short = 'e', long = "export", value_name = "FOLDER")]
    pub export: Vec<String>,

    /// Directory to write archives to (defaults to the Downloads directory)
    #[arg(short = 'o', long = "out", value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// How deep to look inside given directories
    #[arg(short = 'd', long = "depth", default_value_t = 1)]
    pub depth: usize,

    /// Include hidden files (files starting with .)
    #[arg(long = "hidden", action = ArgAction::SetTrue)]
    pub include_hidden: bool,

    /// Gemini model to use (overrides PHOTO_SORTER_MODEL)
    #[arg(short = 'm', long = "model")]
    pub model: Option<String>,

    /// Print the final session as JSON instead of a folder listing
    #[arg(long = "json", action = ArgAction::SetTrue)]
    pub json: bool,

    /// Save a Gemini API key in the system keychain and exit
    #[arg(long = "store-key", value_name = "KEY")]
    pub store_key: Option<String>,

    /// Remove the stored Gemini API key from the keychain and exit
    #[arg(long = "forget-key", action = ArgAction::SetTrue, conflicts_with = "store_key")]
    pub forget_key: bool,
}

/// What to export once organizing is done
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    All,
    Named(Vec<String>),
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn intake_options(&self) -> IntakeOptions {
        IntakeOptions {
            max_depth: self.depth,
            include_hidden: self.include_hidden,
        }
    }

    pub fn export_dir(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(default_export_dir)
    }

    pub fn export_target(&self) -> ExportTarget {
        if self.export.iter().any(|name| name.eq_ignore_ascii_case("all")) {
            ExportTarget::All
        } else {
            ExportTarget::Named(self.export.clone())
        }
    }

    /// Validate arguments clap cannot check on its own
    pub fn validate(&self) -> Result<(), String> {
        if self.depth == 0 {
            return Err("--depth must be at least 1".to_string());
        }
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err("--model must not be empty".to_string());
            }
        }
        Ok(())
    }
}
