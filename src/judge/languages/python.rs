//! Python language handler

use crate::constants::container_images;

use super::LanguageHandler;

pub fn handler() -> LanguageHandler {
    LanguageHandler {
        image: container_images::PYTHON.to_string(),
        source_file: "solution.py".to_string(),
        // Syntax check only
        compile_command: Some("python3 -m py_compile /scratch/solution.py".to_string()),
        run_command: "python3 /scratch/solution.py".to_string(),
    }
}
