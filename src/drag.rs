//! # Interactive Placement Controller
//!
//! Turns pointer drag gestures on the preview surface into configuration
//! updates. A drag is a pure visual follow until release: only pointer-up
//! maps the dragged extent's center back through the transform inverse and
//! writes the new anchor into the store (which triggers a full preview
//! re-render, snapping the field to its authoritative position).

use crate::compose::{Rect, RenderedField};
use crate::error::PlacardError;
use crate::field::FieldProp;
use crate::store::{ConfigSink, ConfigStore, EditMode, UpdateOutcome};
use crate::view::ViewTransform;

/// The committed end of a drag: the field and its new template anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct DragCommit {
    pub field: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging {
        field: String,
        rect: Rect,
        last: (f32, f32),
    },
}

/// Single-gesture drag state machine.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// Pointer-down: hit-test against the drawn extents (topmost first —
    /// later entries draw on top). On a hit, captures the field and returns
    /// its name so the caller can drive selection in the style panel.
    pub fn pointer_down(&mut self, pos: (f32, f32), fields: &[RenderedField]) -> Option<String> {
        let hit = fields
            .iter()
            .rev()
            .find(|f| f.rect.contains(pos.0, pos.1))?;
        self.state = DragState::Dragging {
            field: hit.name.clone(),
            rect: hit.rect,
            last: pos,
        };
        Some(hit.name.clone())
    }

    /// Pointer-move: visual follow only. Returns the delta the caller should
    /// move the field's on-surface visual by; no configuration changes yet.
    pub fn pointer_move(&mut self, pos: (f32, f32)) -> Option<(f32, f32)> {
        let DragState::Dragging { rect, last, .. } = &mut self.state else {
            return None;
        };
        let delta = (pos.0 - last.0, pos.1 - last.1);
        rect.translate(delta.0, delta.1);
        *last = pos;
        Some(delta)
    }

    /// Pointer-up: convert the dragged extent's center back to template
    /// pixels. Returns `None` (and mutates nothing) when no field was
    /// captured. The controller returns to idle either way.
    pub fn pointer_up(&mut self, transform: &ViewTransform) -> Option<DragCommit> {
        let state = std::mem::take(&mut self.state);
        let DragState::Dragging { field, rect, .. } = state else {
            return None;
        };
        let (x, y) = transform.to_template(rect.center());
        Some(DragCommit { field, x, y })
    }

    /// Pointer-up that also writes the new anchor into the store under the
    /// active edit mode. Returns the committed template anchor, if any.
    pub fn release<S: ConfigSink>(
        &mut self,
        transform: &ViewTransform,
        store: &mut ConfigStore<S>,
        mode: EditMode,
        idx: usize,
    ) -> Result<Option<(i32, i32)>, PlacardError> {
        let Some(commit) = self.pointer_up(transform) else {
            return Ok(None);
        };
        let x_outcome = store.update(&commit.field, FieldProp::X(commit.x), mode, idx)?;
        store.update(&commit.field, FieldProp::Y(commit.y), mode, idx)?;
        if x_outcome == UpdateOutcome::Applied {
            Ok(Some((commit.x, commit.y)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySink;
    use crate::view::Zoom;

    fn fields() -> Vec<RenderedField> {
        vec![
            RenderedField {
                name: "under".to_string(),
                rect: Rect::centered(100.0, 100.0, 60.0, 40.0),
            },
            RenderedField {
                name: "over".to_string(),
                rect: Rect::centered(110.0, 100.0, 60.0, 40.0),
            },
        ]
    }

    fn identity_transform() -> ViewTransform {
        ViewTransform {
            scale: 1.0,
            origin_x: 0.0,
            origin_y: 0.0,
        }
    }

    #[test]
    fn test_pointer_down_selects_topmost_hit() {
        let mut drag = DragController::new();
        // (105,100) is inside both extents; the later-drawn one wins
        let selected = drag.pointer_down((105.0, 100.0), &fields());
        assert_eq!(selected.as_deref(), Some("over"));
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_pointer_down_misses_everything() {
        let mut drag = DragController::new();
        assert!(drag.pointer_down((500.0, 500.0), &fields()).is_none());
        assert!(!drag.is_dragging());
        // Release without a captured field mutates nothing
        assert!(drag.pointer_up(&identity_transform()).is_none());
    }

    #[test]
    fn test_move_is_visual_follow_only() {
        let mut drag = DragController::new();
        drag.pointer_down((100.0, 100.0), &fields());
        let delta = drag.pointer_move((130.0, 90.0)).unwrap();
        assert_eq!(delta, (30.0, -10.0));
        // Deltas chain from the last position
        let delta = drag.pointer_move((140.0, 90.0)).unwrap();
        assert_eq!(delta, (10.0, 0.0));
    }

    #[test]
    fn test_release_commits_dragged_center_through_inverse() {
        let mut drag = DragController::new();
        drag.pointer_down((110.0, 100.0), &fields());
        drag.pointer_move((160.0, 130.0));

        let transform = ViewTransform::fit((800, 600), (800, 600), Zoom::default());
        let commit = drag.pointer_up(&transform).unwrap();
        assert_eq!(commit.field, "over");
        // Dragged +50,+30 from a center of (110,100)
        let expected = transform.to_template((160.0, 130.0));
        assert_eq!((commit.x, commit.y), expected);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_release_writes_both_axes_into_store() {
        let (mut store, _) = ConfigStore::open(MemorySink::new());
        store.ensure_fields(["name"]).unwrap();

        let mut drag = DragController::new();
        let extents = vec![RenderedField {
            name: "name".to_string(),
            rect: Rect::centered(50.0, 50.0, 20.0, 20.0),
        }];
        drag.pointer_down((50.0, 50.0), &extents);
        drag.pointer_move((200.0, 120.0));

        let committed = drag
            .release(&identity_transform(), &mut store, EditMode::Global, 0)
            .unwrap()
            .unwrap();
        assert_eq!(committed, (200, 120));
        let cfg = store.field("name").unwrap();
        assert_eq!((cfg.x(), cfg.y()), (200, 120));
    }

    #[test]
    fn test_release_under_individual_mode_customizes_record() {
        let (mut store, _) = ConfigStore::open(MemorySink::new());
        store.ensure_fields(["name"]).unwrap();

        let mut drag = DragController::new();
        let extents = vec![RenderedField {
            name: "name".to_string(),
            rect: Rect::centered(50.0, 50.0, 20.0, 20.0),
        }];
        drag.pointer_down((50.0, 50.0), &extents);
        drag.pointer_move((80.0, 90.0));
        drag.release(&identity_transform(), &mut store, EditMode::Individual, 4)
            .unwrap();

        assert!(store.is_customized(4));
        let resolved = store.resolve(4);
        assert_eq!((resolved["name"].x(), resolved["name"].y()), (80, 90));
        // Global untouched
        assert_eq!(store.field("name").unwrap().x(), 50);
    }
}
