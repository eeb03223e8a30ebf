//! C# language handler (Mono toolchain)

use crate::constants::container_images;

use super::LanguageHandler;

pub fn handler() -> LanguageHandler {
    LanguageHandler {
        image: container_images::CSHARP.to_string(),
        source_file: "solution.cs".to_string(),
        compile_command: Some(
            "mcs -optimize+ -out:/scratch/solution.exe /scratch/solution.cs".to_string(),
        ),
        run_command: "mono /scratch/solution.exe".to_string(),
    }
}
