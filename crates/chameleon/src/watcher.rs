//! File watching for definition changes.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the definition watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A semantic component file was created or modified
    Component(PathBuf),

    /// An adapter file was created or modified
    Adapter(PathBuf),

    /// A theme file was created or modified
    Theme(PathBuf),

    /// A definition file was deleted
    Removed(PathBuf),
}

/// Watches a config directory for definition changes.
pub struct DefinitionWatcher {
    _watcher: RecommendedWatcher,
}

impl DefinitionWatcher {
    /// Watch `config_dir` recursively.
    ///
    /// Returns the watcher and a channel to receive events. Dropping the
    /// watcher stops the events.
    pub fn new(config_dir: &Path) -> Result<(Self, async_mpsc::Receiver<WatchEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(config_dir, RecursiveMode::Recursive)
            .map_err(std::io::Error::other)?;

        // Forward classified events, dropping repeats of the same path
        std::thread::spawn(move || {
            let debounce = Duration::from_millis(100);
            let mut last: Option<(PathBuf, Instant)> = None;

            while let Ok(event) = sync_rx.recv() {
                for path in event.paths {
                    let now = Instant::now();
                    if let Some((prev, at)) = &last {
                        if prev == &path && now.duration_since(*at) < debounce {
                            continue;
                        }
                    }
                    last = Some((path.clone(), now));

                    if let Some(e) = classify_event(&path, &event.kind) {
                        if async_tx.blocking_send(e).is_err() {
                            return;
                        }
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Classify a notify event by the directory the file lives in.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<WatchEvent> {
    use notify::EventKind;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if !matches!(ext, "yaml" | "yml" | "json") {
        return None;
    }

    let parent = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("");

    match kind {
        EventKind::Remove(_) => Some(WatchEvent::Removed(path.to_path_buf())),
        EventKind::Create(_) | EventKind::Modify(_) => match parent {
            "components" => Some(WatchEvent::Component(path.to_path_buf())),
            "adapters" => Some(WatchEvent::Adapter(path.to_path_buf())),
            "themes" => Some(WatchEvent::Theme(path.to_path_buf())),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use notify::EventKind;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_by_directory() {
        let modify = EventKind::Modify(ModifyKind::Any);

        assert_eq!(
            classify_event(Path::new("cfg/components/Button.yaml"), &modify),
            Some(WatchEvent::Component(PathBuf::from("cfg/components/Button.yaml")))
        );
        assert_eq!(
            classify_event(Path::new("cfg/adapters/vuetify.json"), &EventKind::Create(CreateKind::File)),
            Some(WatchEvent::Adapter(PathBuf::from("cfg/adapters/vuetify.json")))
        );
        assert_eq!(
            classify_event(Path::new("cfg/adapters/vuetify.yaml"), &EventKind::Remove(RemoveKind::File)),
            Some(WatchEvent::Removed(PathBuf::from("cfg/adapters/vuetify.yaml")))
        );
        assert_eq!(classify_event(Path::new("cfg/components/notes.txt"), &modify), None);
        assert_eq!(classify_event(Path::new("cfg/other/x.yaml"), &modify), None);
    }

    #[tokio::test]
    async fn watches_component_changes() {
        let temp = tempdir().unwrap();
        let components = temp.path().join("components");
        fs::create_dir_all(&components).unwrap();

        let (watcher, mut rx) = DefinitionWatcher::new(temp.path()).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(components.join("Button.yaml"), "name: Button\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for file watch event");
        assert!(
            matches!(event.unwrap(), Some(WatchEvent::Component(_))),
            "expected a component event"
        );
    }
}
