use crate::canvas::Canvas;
use crate::debug::DebugLogger;
use crate::flow::Flow;
use crate::layout::LayoutNode;
use crate::types::{Pt, Rect};
use serde_json::json;

pub enum AddResult {
    Placed,
    Split(LayoutNode),
    Overflow(LayoutNode),
}

/// Vertical content area of one page, filled top to bottom.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    pub fn add(
        &mut self,
        node: LayoutNode,
        flow: &Flow<'_>,
        canvas: &mut Canvas,
        debug: Option<&DebugLogger>,
    ) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        if avail_height <= Pt::ZERO {
            return AddResult::Overflow(node);
        }

        let height = flow.measure(&node, avail_width);
        if height <= avail_height {
            flow.draw(
                &node,
                canvas,
                self.rect.x,
                self.rect.y + self.cursor_y,
                avail_width,
            );
            self.cursor_y += height;
            return AddResult::Placed;
        }

        if let Some((first, rest)) = flow.split(&node, avail_width, avail_height) {
            let first_height = flow.measure(&first, avail_width);
            if first_height > Pt::ZERO && first_height <= avail_height {
                flow.draw(
                    &first,
                    canvas,
                    self.rect.x,
                    self.rect.y + self.cursor_y,
                    avail_width,
                );
                self.cursor_y += first_height;
                return AddResult::Split(rest);
            }
        }

        // Taller than a whole page and unsplittable: place it clipped so
        // pagination keeps moving.
        if self.is_empty() {
            if let Some(logger) = debug {
                logger.event(
                    "layout.oversized_block",
                    json!({
                        "kind": node.kind(),
                        "height": height.to_f32(),
                        "frame_height": self.rect.height.to_f32(),
                    }),
                );
                logger.increment("layout.oversized_block", 1);
            }
            let y = self.rect.y + self.cursor_y;
            canvas.save_state();
            canvas.clip_rect(self.rect.x, y, avail_width, avail_height);
            flow.draw(&node, canvas, self.rect.x, y, avail_width);
            canvas.restore_state();
            self.cursor_y = self.rect.height;
            return AddResult::Placed;
        }

        AddResult::Overflow(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetBundle;
    use crate::canvas::Command;
    use crate::layout::{Column, Row, Slot, Spacer};
    use crate::types::Size;

    fn frame(height: f32) -> Frame {
        Frame::new(Rect {
            x: Pt::from_f32(20.0),
            y: Pt::from_f32(40.0),
            width: Pt::from_f32(500.0),
            height: Pt::from_f32(height),
        })
    }

    fn block(height: f32) -> LayoutNode {
        Row::new()
            .slot(Slot::relative(1.0, Spacer::new(height)))
            .into()
    }

    #[test]
    fn atomic_block_overflows_a_partly_filled_frame() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame(100.0);
        assert!(matches!(
            frame.add(block(60.0), &flow, &mut canvas, None),
            AddResult::Placed
        ));
        assert_eq!(frame.remaining_height(), Pt::from_f32(40.0));
        assert!(matches!(
            frame.add(block(60.0), &flow, &mut canvas, None),
            AddResult::Overflow(_)
        ));
    }

    #[test]
    fn column_splits_between_children() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame(100.0);
        let column: LayoutNode = Column::new()
            .item(block(40.0))
            .item(block(40.0))
            .item(block(40.0))
            .into();
        match frame.add(column, &flow, &mut canvas, None) {
            AddResult::Split(LayoutNode::Column(rest)) => assert_eq!(rest.slots.len(), 1),
            _ => panic!("expected a split column"),
        }
    }

    #[test]
    fn oversized_block_is_clipped_on_an_empty_frame() {
        let assets = AssetBundle::new();
        let flow = Flow::new(&assets);
        let mut canvas = Canvas::new(Size::a4());
        let mut frame = frame(100.0);
        assert!(matches!(
            frame.add(block(500.0), &flow, &mut canvas, None),
            AddResult::Placed
        ));
        assert_eq!(frame.remaining_height(), Pt::ZERO);
        let commands = canvas.take_current();
        assert!(matches!(commands.first(), Some(Command::SaveState)));
        assert!(commands.iter().any(|c| matches!(c, Command::ClipRect { .. })));
        assert!(matches!(commands.last(), Some(Command::RestoreState)));
    }
}
