use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ai::client::GeminiClient;
use crate::ai::credentials::CredentialManager;
use crate::cli::{Args, ExportTarget};
use crate::config::{validate_api_key, AppConfig, KEYCHAIN_PROVIDER};
use crate::models::Folder;
use crate::services::intake::IntakeSource;
use crate::session::{PhotoSession, SessionView};

/// Save an API key in the keychain
pub fn store_key(api_key: &str) -> Result<(), String> {
    validate_api_key(api_key)?;
    let replacing = CredentialManager::has_api_key(KEYCHAIN_PROVIDER);
    CredentialManager::store_api_key(KEYCHAIN_PROVIDER, api_key)?;
    if replacing {
        println!("Replaced the Gemini API key in the system keychain.");
    } else {
        println!("Gemini API key saved to the system keychain.");
    }
    Ok(())
}

/// Remove the stored API key from the keychain
pub fn forget_key() -> Result<(), String> {
    if !CredentialManager::has_api_key(KEYCHAIN_PROVIDER) {
        println!("No Gemini API key stored.");
        return Ok(());
    }
    CredentialManager::delete_api_key(KEYCHAIN_PROVIDER)?;
    println!("Gemini API key removed from the system keychain.");
    Ok(())
}

/// Organize the given paths and export the requested folders
pub async fn organize_paths(args: &Args) -> Result<(), String> {
    let mut config = AppConfig::from_env()?;
    if let Some(model) = &args.model {
        config.model = model.trim().to_string();
    }

    let client = GeminiClient::new(&config).map_err(|e| e.to_string())?;
    tracing::info!(model = client.model(), "Using Gemini model");

    let session = PhotoSession::new(Arc::new(client));
    let result = run_session(&session, args).await;

    // Release previews whatever happened
    session.reset().await?;
    result
}

/// Intake → organize → print → export, against any classification service
pub async fn run_session(session: &PhotoSession, args: &Args) -> Result<(), String> {
    let accepted = session
        .intake(IntakeSource::Picker(args.paths.clone()), &args.intake_options())
        .await?;

    if accepted == 0 {
        println!("No images found in the given paths.");
        return Ok(());
    }

    println!("Organizing {} photos...", accepted);
    let organize_result = session.organize().await;
    let view = session.snapshot().await;

    if args.json {
        let json = serde_json::to_string_pretty(&view)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        println!("{}", json);
    } else {
        print_folders(&view);
    }

    organize_result?;

    for index in select_exports(&view.folders, &args.export_target())? {
        let path = export_one(session, index, &args.export_dir()).await?;
        println!("Saved {}", path.display());
    }

    Ok(())
}

async fn export_one(session: &PhotoSession, index: usize, dir: &Path) -> Result<PathBuf, String> {
    let archive = session.export_folder(index).await?;
    let path = archive.save_to(dir).await?;
    Ok(path)
}

/// Resolve export targets to folder indices; unknown names are an error
fn select_exports(folders: &[Folder], target: &ExportTarget) -> Result<Vec<usize>, String> {
    match target {
        ExportTarget::All => Ok((0..folders.len()).collect()),
        ExportTarget::Named(names) => names
            .iter()
            .map(|name| {
                folders
                    .iter()
                    .position(|f| f.name.eq_ignore_ascii_case(name.trim()))
                    .ok_or_else(|| format!("No folder named '{}'", name))
            })
            .collect(),
    }
}

fn print_folders(view: &SessionView) {
    if let Some(message) = &view.message {
        eprintln!("{}", message);
        return;
    }

    for folder in &view.folders {
        println!("\n{} ({} photos)", folder.name, folder.member_indices.len());
        if !folder.description.is_empty() {
            println!("  {}", folder.description);
        }
        for &index in &folder.member_indices {
            let name = usize::try_from(index)
                .ok()
                .and_then(|i| view.photos.get(i))
                .map(|p| p.name.as_str())
                .unwrap_or("<unknown photo>");
            println!("  - {}", name);
        }
    }

    if let Some(coverage) = view.coverage.as_ref().filter(|c| !c.is_complete()) {
        if !coverage.missing.is_empty() {
            println!("\nNot placed in any folder: {} photos", coverage.missing.len());
        }
        if !coverage.out_of_range.is_empty() {
            println!("Unknown photo indices returned: {:?}", coverage.out_of_range);
        }
    }
}
