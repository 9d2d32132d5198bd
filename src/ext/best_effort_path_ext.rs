use std::path::{Component, Path, PathBuf};

/// Absolute, normalized rendering of a path for messages, even when it does not exist.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical) = path.canonicalize() {
        return canonical.display().to_string();
    }

    let absolute = match std::env::current_dir() {
        Ok(current_dir) if path.is_relative() => current_dir.join(path),
        _ => path.to_path_buf(),
    };
    normalize(&absolute).display().to_string()
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .fold(Vec::new(), |mut components, component| {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if matches!(components.last(), Some(Component::Normal(_))) {
                        components.pop();
                    }
                }
                _ => components.push(component),
            }
            components
        })
        .iter()
        .collect()
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl BestEffortPathExt for Path {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

impl BestEffortPathExt for PathBuf {
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("/missing/./a/../b", "/missing/b")]
    #[case("/missing/../../c", "/c")]
    fn missing_paths_are_normalized(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(Path::new(path).best_effort_path_display(), expected);
    }

    #[test]
    fn relative_paths_become_absolute() {
        let display = PathBuf::from("definitely-missing.yaml").best_effort_path_display();
        assert!(Path::new(&display).is_absolute());
        assert!(display.ends_with("definitely-missing.yaml"));
    }
}
