//! Structural reconciliation of the scene collection.
//!
//! Scenes are held as `Arc<Scene>` so that every update produces a new
//! collection in which untouched scenes are the very same allocations as
//! before. Consumers can compare with `Arc::ptr_eq` to find what changed.

use sk_protocol::{Scene, SceneOutline, SceneStatus};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Scene {0} has no matching outline")]
    NoOutline(u32),

    #[error("Scene {0} is not in the collection")]
    MissingScene(u32),

    #[error("Expected scene {expected} from the backend, got scene {actual}")]
    SceneMismatch { expected: u32, actual: u32 },
}

/// Replace the element whose key equals `key`, keeping every other element
/// by reference. Returns `None` when no element has that key.
pub fn replace_by_key<T, K, F>(
    items: &[Arc<T>],
    key: &K,
    key_of: F,
    replacement: Arc<T>,
) -> Option<Vec<Arc<T>>>
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let position = items.iter().position(|item| key_of(item) == *key)?;
    let mut next = items.to_vec();
    next[position] = replacement;
    Some(next)
}

/// Insert a freshly written scene, replacing any scene with the same number.
///
/// Returns the new collection and the scene's index in it. A scene without
/// a matching outline is rejected.
pub fn upsert_scene(
    outlines: &[SceneOutline],
    scenes: &[Arc<Scene>],
    scene: Arc<Scene>,
) -> Result<(Vec<Arc<Scene>>, usize), ReconcileError> {
    let number = scene.scene_number;
    if !outlines.iter().any(|o| o.scene_number == number) {
        return Err(ReconcileError::NoOutline(number));
    }

    if let Some(index) = scenes.iter().position(|s| s.scene_number == number) {
        let mut next = scenes.to_vec();
        next[index] = scene;
        return Ok((next, index));
    }

    let mut next = scenes.to_vec();
    next.push(scene);
    let index = next.len() - 1;
    Ok((next, index))
}

/// Replace scene `scene_number` with the backend's rewritten version.
pub fn replace_scene(
    scenes: &[Arc<Scene>],
    scene_number: u32,
    scene: Arc<Scene>,
) -> Result<Vec<Arc<Scene>>, ReconcileError> {
    if scene.scene_number != scene_number {
        return Err(ReconcileError::SceneMismatch {
            expected: scene_number,
            actual: scene.scene_number,
        });
    }
    replace_by_key(scenes, &scene_number, |s| s.scene_number, scene)
        .ok_or(ReconcileError::MissingScene(scene_number))
}

/// Set the status of scene `scene_number`.
///
/// A scene that already has the status keeps its allocation, so the
/// returned collection is element-wise identical to the input.
pub fn with_status(
    scenes: &[Arc<Scene>],
    scene_number: u32,
    status: SceneStatus,
) -> Result<Vec<Arc<Scene>>, ReconcileError> {
    let current = scenes
        .iter()
        .find(|s| s.scene_number == scene_number)
        .ok_or(ReconcileError::MissingScene(scene_number))?;

    if current.status == status {
        return Ok(scenes.to_vec());
    }

    let updated = Scene {
        status,
        ..Scene::clone(current)
    };
    replace_by_key(scenes, &scene_number, |s| s.scene_number, Arc::new(updated))
        .ok_or(ReconcileError::MissingScene(scene_number))
}

/// Keep only scenes that have an outline, dropping duplicates by number.
pub fn retain_outlined(outlines: &[SceneOutline], scenes: Vec<Arc<Scene>>) -> Vec<Arc<Scene>> {
    let outlined: HashSet<u32> = outlines.iter().map(|o| o.scene_number).collect();
    let mut seen = HashSet::new();

    scenes
        .into_iter()
        .filter(|scene| {
            let number = scene.scene_number;
            if !outlined.contains(&number) {
                tracing::warn!(scene_number = number, "dropping scene without outline");
                return false;
            }
            if !seen.insert(number) {
                tracing::warn!(scene_number = number, "dropping duplicate scene");
                return false;
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outline(n: u32) -> SceneOutline {
        SceneOutline {
            scene_number: n,
            location: format!("LOC {n}"),
            time_of_day: "DAY".to_string(),
            duration_seconds: 60,
            brief_description: String::new(),
            beat_reference: None,
            emotional_arc: None,
        }
    }

    fn scene(n: u32) -> Scene {
        Scene {
            scene_number: n,
            header: format!("INT. LOC {n} - DAY"),
            action: "Action.".to_string(),
            dialogue: vec![],
            duration_seconds: 60,
            status: SceneStatus::Draft,
            revision_count: 0,
            notes: None,
        }
    }

    fn arcs(numbers: &[u32]) -> Vec<Arc<Scene>> {
        numbers.iter().map(|n| Arc::new(scene(*n))).collect()
    }

    #[test]
    fn test_replace_keeps_untouched_references() {
        let scenes = arcs(&[1, 2, 3]);
        let mut revised = scene(2);
        revised.action = "Louder.".to_string();

        let next = replace_scene(&scenes, 2, Arc::new(revised)).unwrap();
        assert!(Arc::ptr_eq(&next[0], &scenes[0]));
        assert!(!Arc::ptr_eq(&next[1], &scenes[1]));
        assert!(Arc::ptr_eq(&next[2], &scenes[2]));
        assert_eq!(next[1].action, "Louder.");
        // Input untouched
        assert_eq!(scenes[1].action, "Action.");
    }

    #[test]
    fn test_replace_rejects_mismatch_and_missing() {
        let scenes = arcs(&[1]);
        assert_eq!(
            replace_scene(&scenes, 1, Arc::new(scene(2))),
            Err(ReconcileError::SceneMismatch {
                expected: 1,
                actual: 2
            })
        );
        assert_eq!(
            replace_scene(&scenes, 4, Arc::new(scene(4))),
            Err(ReconcileError::MissingScene(4))
        );
    }

    #[test]
    fn test_upsert_appends_new_scene() {
        let outlines: Vec<_> = (1..=3).map(outline).collect();
        let scenes = arcs(&[1]);

        let (next, index) = upsert_scene(&outlines, &scenes, Arc::new(scene(2))).unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(index, 1);
        assert!(Arc::ptr_eq(&next[0], &scenes[0]));
    }

    #[test]
    fn test_upsert_replaces_same_number() {
        let outlines: Vec<_> = (1..=3).map(outline).collect();
        let scenes = arcs(&[1, 2]);

        let (next, index) = upsert_scene(&outlines, &scenes, Arc::new(scene(1))).unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(index, 0);
        assert!(Arc::ptr_eq(&next[1], &scenes[1]));
    }

    #[test]
    fn test_upsert_rejects_scene_without_outline() {
        let outlines = vec![outline(1)];
        let result = upsert_scene(&outlines, &[], Arc::new(scene(5)));
        assert_eq!(result.unwrap_err(), ReconcileError::NoOutline(5));
    }

    #[test]
    fn test_with_status_is_identity_when_unchanged() {
        let mut approved = scene(1);
        approved.status = SceneStatus::Approved;
        let scenes = vec![Arc::new(approved), Arc::new(scene(2))];

        let next = with_status(&scenes, 1, SceneStatus::Approved).unwrap();
        assert!(next.iter().zip(&scenes).all(|(a, b)| Arc::ptr_eq(a, b)));

        let next = with_status(&scenes, 2, SceneStatus::Approved).unwrap();
        assert!(Arc::ptr_eq(&next[0], &scenes[0]));
        assert_eq!(next[1].status, SceneStatus::Approved);
        assert_eq!(scenes[1].status, SceneStatus::Draft);
    }

    #[test]
    fn test_retain_outlined_drops_orphans_and_duplicates() {
        let outlines: Vec<_> = (1..=2).map(outline).collect();
        let scenes = arcs(&[1, 3, 2, 2]);
        let kept = retain_outlined(&outlines, scenes.clone());

        assert_eq!(kept.len(), 2);
        assert!(Arc::ptr_eq(&kept[0], &scenes[0]));
        assert!(Arc::ptr_eq(&kept[1], &scenes[2]));
    }
}
