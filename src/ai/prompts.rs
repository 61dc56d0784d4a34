use serde_json::{json, Value};

/// Instruction sent with every organize request
pub const ORGANIZE_INSTRUCTION: &str = r#"You are a photo organizing assistant. Analyze the following images and group them into logical folders based on their content, subject, event or theme.

RULES:
1. Give every folder a short, descriptive name (e.g. "Beach Day", "Birthday Party", "City Architecture")
2. Give every folder a one-sentence description of what its photos have in common
3. Refer to photos by their zero-based index in the order they were provided
4. Every photo index must appear in exactly one folder
5. Prefer a handful of meaningful folders over many single-photo folders

Respond with JSON only, following the provided schema."#;

/// Response schema for organize requests: an array of folders, each with a
/// name, a one-sentence description and the indices of its photos.
pub fn folder_response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "folderName": {
                    "type": "STRING",
                    "description": "A short, descriptive name for the folder."
                },
                "description": {
                    "type": "STRING",
                    "description": "A one-sentence description of the photos in this folder."
                },
                "photoIndices": {
                    "type": "ARRAY",
                    "description": "Zero-based indices of the photos that belong in this folder.",
                    "items": { "type": "INTEGER" }
                }
            },
            "required": ["folderName", "description", "photoIndices"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_requires_all_folder_fields() {
        let schema = folder_response_schema();
        assert_eq!(schema["type"], "ARRAY");

        let required: Vec<&str> = schema["items"]["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(required, vec!["folderName", "description", "photoIndices"]);
        assert_eq!(
            schema["items"]["properties"]["photoIndices"]["items"]["type"],
            "INTEGER"
        );
    }
}
