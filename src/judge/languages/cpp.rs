//! C++ language handler

use crate::constants::container_images;

use super::LanguageHandler;

pub fn handler() -> LanguageHandler {
    LanguageHandler {
        image: container_images::CPP.to_string(),
        source_file: "solution.cpp".to_string(),
        compile_command: Some(
            "g++ -O2 -std=c++17 -o /scratch/solution /scratch/solution.cpp".to_string(),
        ),
        run_command: "/scratch/solution".to_string(),
    }
}
