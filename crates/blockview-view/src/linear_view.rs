//! Flat listing of every block, in address order.

use crate::settings::ViewSettings;
use blockview_core::{Address, AnalysisSource, BasicBlock, Vec2};
use blockview_events::{Notification, NotificationListener};
use blockview_graph::{BlockMode, BlockModel, Canvas, DetailLevel, RenderOptions, SelectionQuery, Theme};
use std::collections::BTreeMap;

pub struct LinearView<S: AnalysisSource> {
    source: S,
    options: RenderOptions,
    theme: Theme,
    blocks: Vec<BlockModel>,
    /// First line of each block; parallel to `blocks`.
    start_lines: Vec<usize>,
    total_lines: usize,
    top_line: usize,
}

impl<S: AnalysisSource> LinearView<S> {
    pub const LEFT_MARGIN: f32 = 50.0;
    pub const TOP_MARGIN: f32 = 25.0;
    pub const RIGHT_MARGIN: f32 = 10.0;
    pub const BOTTOM_MARGIN: f32 = 25.0;

    pub fn new(source: S, settings: &ViewSettings) -> Self {
        let mut view = Self {
            source,
            options: settings.render_options(BlockMode::Linear),
            theme: settings.theme,
            blocks: Vec::new(),
            start_lines: Vec::new(),
            total_lines: 0,
            top_line: 0,
        };
        view.reload();
        view
    }

    /// Rebuild the listing from every function in the source.
    pub fn reload(&mut self) {
        let mut by_addr: BTreeMap<Address, BasicBlock> = BTreeMap::new();
        for function in self.source.functions() {
            let Some(graph) = self.source.function_graph(function) else {
                tracing::debug!("Function {} vanished during linear reload", function);
                continue;
            };
            for block in graph.blocks {
                by_addr.entry(block.addr).or_insert(block);
            }
        }
        self.blocks = by_addr
            .values()
            .map(|block| BlockModel::build(block, &self.source, self.options))
            .collect();
        self.recount();
        self.top_line = self.top_line.min(self.max_top_line());
        tracing::debug!("Linear view holds {} blocks, {} lines", self.blocks.len(), self.total_lines);
    }

    /// Re-read annotations in place.
    pub fn refresh(&mut self) {
        for block in &mut self.blocks {
            block.refresh(&self.source);
        }
        self.recount();
        self.top_line = self.top_line.min(self.max_top_line());
    }

    fn recount(&mut self) {
        self.start_lines.clear();
        let mut line = 0;
        for block in &self.blocks {
            self.start_lines.push(line);
            line += block.elements().len();
        }
        self.total_lines = line;
    }

    pub fn blocks(&self) -> &[BlockModel] {
        &self.blocks
    }

    pub fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn top_line(&self) -> usize {
        self.top_line
    }

    fn line_height(&self) -> f32 {
        self.options.metrics.line_height
    }

    fn max_top_line(&self) -> usize {
        self.total_lines.saturating_sub(1)
    }

    /// Size of the whole listing including margins.
    pub fn scene_size(&self) -> Vec2 {
        let widest = self.blocks.iter().map(|b| b.size().x).fold(0.0, f32::max);
        Vec2::new(
            Self::LEFT_MARGIN + widest + Self::RIGHT_MARGIN,
            Self::TOP_MARGIN + self.total_lines as f32 * self.line_height() + Self::BOTTOM_MARGIN,
        )
    }

    pub fn set_top_line(&mut self, line: usize) -> usize {
        self.top_line = line.min(self.max_top_line());
        self.top_line
    }

    pub fn scroll_lines(&mut self, delta: i64) -> usize {
        let target = (self.top_line as i64).saturating_add(delta).max(0);
        self.set_top_line(usize::try_from(target).unwrap_or(usize::MAX))
    }

    pub fn lines_per_page(&self, viewport_height: f32) -> usize {
        let line_height = self.line_height();
        if line_height <= 0.0 {
            return 1;
        }
        ((viewport_height / line_height).floor() as usize).max(1)
    }

    pub fn scroll_pages(&mut self, delta: i64, viewport_height: f32) -> usize {
        let page = self.lines_per_page(viewport_height) as i64;
        self.scroll_lines(delta.saturating_mul(page))
    }

    /// Scroll so the block holding `addr` (or the closest block before it)
    /// starts at the top. Returns the block shown.
    pub fn navigate_to(&mut self, addr: Address) -> Option<Address> {
        if self.blocks.is_empty() {
            return None;
        }
        let index = self.blocks.partition_point(|block| block.addr <= addr).saturating_sub(1);
        let block = &self.blocks[index];
        let row = block
            .instruction_position(addr)
            .map(|pos| (pos.y / self.line_height()) as usize)
            .unwrap_or(0);
        let shown = block.addr;
        self.set_top_line(self.start_lines[index] + row);
        Some(shown)
    }

    /// Blocks overlapping the visible lines, with their screen origins.
    pub fn visible_blocks(&self, viewport_height: f32) -> Vec<(Address, Vec2)> {
        let first = self.top_line;
        let last = first + self.lines_per_page(viewport_height);
        self.blocks
            .iter()
            .zip(&self.start_lines)
            .filter(|&(block, &start)| start < last && start + block.elements().len() > first)
            .map(|(block, &start)| {
                let y = Self::TOP_MARGIN + (start as f32 - first as f32) * self.line_height();
                (block.addr, Vec2::new(Self::LEFT_MARGIN, y))
            })
            .collect()
    }

    pub fn paint(&self, canvas: &mut dyn Canvas, viewport_height: f32, selection: &dyn SelectionQuery) -> usize {
        let visible = self.visible_blocks(viewport_height);
        for &(addr, origin) in &visible {
            if let Ok(index) = self.blocks.binary_search_by_key(&addr, |b| b.addr) {
                self.blocks[index].paint(canvas, origin, &self.theme, selection, DetailLevel::Full);
            }
        }
        visible.len()
    }
}

impl<S: AnalysisSource> NotificationListener for LinearView<S> {
    fn handle_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::GraphUpdated { .. } => self.reload(),
            Notification::KnowledgeBaseUpdated
            | Notification::LabelRenamed { .. }
            | Notification::CommentChanged { .. } => self.refresh(),
            Notification::SelectedAddressChanged { .. } | Notification::SelectedOperandChanged { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{FunctionGraph, Instruction, ProgramSnapshot, Terminator};

    fn snapshot() -> ProgramSnapshot {
        let f1 = FunctionGraph {
            function: Address(0x2000),
            entry: Address(0x2000),
            blocks: vec![BasicBlock::new(
                0x2000,
                vec![Instruction::new(0x2000, "push", &["rbp"]), Instruction::new(0x2001, "ret", &[])],
                Terminator::Return,
            )],
            edges: vec![],
        };
        let f0 = FunctionGraph {
            function: Address(0x1000),
            entry: Address(0x1000),
            blocks: vec![
                BasicBlock::new(
                    0x1000,
                    vec![Instruction::new(0x1000, "nop", &[]), Instruction::new(0x1001, "nop", &[])],
                    Terminator::Fallthrough { next: Address(0x1002) },
                ),
                BasicBlock::new(0x1002, vec![Instruction::new(0x1002, "ret", &[])], Terminator::Return),
            ],
            edges: vec![(Address(0x1000), Address(0x1002))],
        };
        let mut snapshot = ProgramSnapshot::new().with_function(f1).with_function(f0);
        snapshot.rename_label(Address(0x2000), "main");
        snapshot
    }

    fn view() -> LinearView<ProgramSnapshot> {
        LinearView::new(snapshot(), &ViewSettings::default())
    }

    #[test]
    fn test_blocks_in_address_order() {
        let view = view();
        let addrs: Vec<Address> = view.blocks().iter().map(|b| b.addr).collect();
        assert_eq!(addrs, vec![Address(0x1000), Address(0x1002), Address(0x2000)]);
        // 2 + 1 + (label + 2)
        assert_eq!(view.total_lines(), 6);
    }

    #[test]
    fn test_scrolling_is_clamped() {
        let mut view = view();
        assert_eq!(view.scroll_lines(-3), 0);
        assert_eq!(view.scroll_lines(2), 2);
        assert_eq!(view.scroll_lines(100), 5);
        assert_eq!(view.scroll_pages(-1, 32.0), 3);
        assert_eq!(view.scroll_pages(-10, 32.0), 0);
    }

    #[test]
    fn test_navigate_uses_floor_block() {
        let mut view = view();
        assert_eq!(view.navigate_to(Address(0x2001)), Some(Address(0x2000)));
        assert_eq!(view.top_line(), 5);
        assert_eq!(view.navigate_to(Address(0x1500)), Some(Address(0x1002)));
        assert_eq!(view.top_line(), 2);
        assert_eq!(view.navigate_to(Address(0x10)), Some(Address(0x1000)));
        assert_eq!(view.top_line(), 0);
    }

    #[test]
    fn test_visible_blocks() {
        let mut view = view();
        let visible = view.visible_blocks(32.0);
        assert_eq!(visible, vec![(Address(0x1000), Vec2::new(50.0, 25.0))]);

        view.set_top_line(1);
        let visible: Vec<Address> = view.visible_blocks(32.0).into_iter().map(|(a, _)| a).collect();
        assert_eq!(visible, vec![Address(0x1000), Address(0x1002)]);
    }

    #[test]
    fn test_comment_refresh() {
        let source = std::rc::Rc::new(std::cell::RefCell::new(snapshot()));
        let mut view = LinearView::new(std::rc::Rc::clone(&source), &ViewSettings::default());
        source.borrow_mut().set_comment(Address(0x1002), Some("done".into()));
        view.handle_notification(&Notification::KnowledgeBaseUpdated);
        let block = &view.blocks()[1];
        assert_eq!(
            block.instruction(Address(0x1002)).and_then(|i| i.annotation()),
            Some("done")
        );
    }
}
