//! Control-flow graph view of one function.

use crate::export::{self, ExportError, TextRaster};
use crate::selection::SelectionModel;
use crate::settings::ViewSettings;
use crate::viewport::{PointerOutcome, RedrawRequest, Viewport};
use blockview_core::{
    report_invariant_violation, Address, AnalysisSource, FunctionGraph, Rect, Vec2, ViewError,
};
use blockview_events::{Notification, NotificationListener, Subscription};
use blockview_graph::{
    arrow_head, classify, BlockMode, BlockModel, Canvas, DetailLevel, GraphModel, HitResult,
    HitTester, LayeredLayouter, LayoutResult, Layouter, RenderOptions, TieBreak,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Screen pixels painted beyond the visible region.
const CULL_MARGIN: f32 = 100.0;

/// Everything derived from one function snapshot. Replaced wholesale on reload.
#[derive(Debug, Default)]
struct Scene {
    graph: Option<FunctionGraph>,
    blocks: Vec<BlockModel>,
    block_index: HashMap<Address, usize>,
    insn_to_block: HashMap<Address, Address>,
    layout: LayoutResult,
    hit: HitTester,
}

impl Scene {
    fn block_for_instruction(&self, addr: Address) -> Option<&BlockModel> {
        let block = self.insn_to_block.get(&addr)?;
        self.blocks.get(*self.block_index.get(block)?)
    }

    fn block_for_instruction_mut(&mut self, addr: Address) -> Option<&mut BlockModel> {
        let block = self.insn_to_block.get(&addr)?;
        self.blocks.get_mut(*self.block_index.get(block)?)
    }
}

/// Interactive graph of one function: blocks laid out by the layouter,
/// navigated through a [`Viewport`], highlighted through a [`SelectionModel`].
///
/// Painting emits scene coordinates; the host maps them to the screen with
/// [`Viewport::scene_to_screen`].
pub struct DisasmGraphView<S: AnalysisSource> {
    source: S,
    settings: ViewSettings,
    options: RenderOptions,
    font: Option<fontdue::Font>,
    layouter: LayeredLayouter,
    function: Option<Address>,
    scene: Scene,
    viewport: Viewport,
    selection: SelectionModel,
    _selection_redraw: Subscription,
}

impl<S: AnalysisSource> DisasmGraphView<S> {
    pub fn new(source: S, settings: ViewSettings, viewport_size: Vec2) -> Self {
        let font = settings.load_font();
        let metrics = font
            .as_ref()
            .map(|font| blockview_graph::FontMetrics::from_font(font, settings.font_size))
            .unwrap_or(settings.font);
        let options = RenderOptions {
            metrics,
            show_address: settings.show_address,
            mode: BlockMode::Graph,
        };

        let viewport = Viewport::new(settings.viewport, viewport_size);
        let selection = SelectionModel::new();
        let redraw = viewport.redraw_notifier();
        let selection_redraw = selection.subscribe(move |_| redraw.notify(&RedrawRequest));

        Self {
            source,
            layouter: LayeredLayouter::new(settings.layout),
            settings,
            options,
            font,
            function: None,
            scene: Scene::default(),
            viewport,
            selection,
            _selection_redraw: selection_redraw,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn function(&self) -> Option<Address> {
        self.function
    }

    pub fn layout(&self) -> &LayoutResult {
        &self.scene.layout
    }

    pub fn blocks(&self) -> &[BlockModel] {
        &self.scene.blocks
    }

    pub fn block(&self, addr: Address) -> Option<&BlockModel> {
        self.scene.blocks.get(*self.scene.block_index.get(&addr)?)
    }

    pub fn contains_instruction(&self, addr: Address) -> bool {
        self.scene.insn_to_block.contains_key(&addr)
    }

    /// Display `function`, centered on its entry block.
    pub fn set_function(&mut self, function: Address) -> Result<(), ViewError> {
        tracing::info!("Displaying function {}", function);
        self.function = Some(function);
        let result = self.reload();
        self.reset_view();
        result
    }

    /// Rebuild every block and the layout from the source.
    ///
    /// The new scene is built completely before it replaces the old one.
    pub fn reload(&mut self) -> Result<(), ViewError> {
        let Some(function) = self.function else {
            self.install(Scene::default());
            return Ok(());
        };
        let Some(graph) = self.source.function_graph(function) else {
            tracing::warn!("Function {} is no longer available; clearing view", function);
            self.install(Scene::default());
            return Err(ViewError::lookup("function", function));
        };

        let blocks: Vec<BlockModel> = graph
            .blocks
            .iter()
            .map(|block| BlockModel::build(block, &self.source, self.options))
            .collect();
        let mut scene = Scene {
            block_index: blocks.iter().enumerate().map(|(i, b)| (b.addr, i)).collect(),
            insn_to_block: blocks
                .iter()
                .flat_map(|b| b.instruction_addrs().map(move |insn| (insn, b.addr)))
                .collect(),
            blocks,
            graph: Some(graph),
            ..Scene::default()
        };
        self.lay_out(&mut scene);
        tracing::debug!(
            "Reloaded function {}: {} blocks, {} edges",
            function,
            scene.blocks.len(),
            scene.layout.edges.len()
        );
        self.install(scene);
        Ok(())
    }

    fn install(&mut self, scene: Scene) {
        self.scene = scene;
        let live = &self.scene.insn_to_block;
        // A dropped selection already forwarded its own redraw.
        if !self.selection.retain(|addr| live.contains_key(&addr)) {
            self.viewport.request_redraw();
        }
    }

    fn lay_out(&self, scene: &mut Scene) {
        let Some(graph) = scene.graph.as_ref() else {
            scene.layout = LayoutResult::default();
            scene.hit.clear();
            return;
        };
        let model = GraphModel::from_function(graph);
        let sizes: HashMap<Address, Vec2> = scene.blocks.iter().map(|b| (b.addr, b.size())).collect();
        let by_address = |addr: Address| addr.0 as i64;
        let tie_break: TieBreak<'_> = &by_address;
        let mut layout = self.layouter.layout(&model, &sizes, Some(tie_break));
        classify(&mut layout.edges, graph);
        scene.layout = layout;
        self.register_hits(scene);
    }

    /// Rebuild the hit index from the current positions and row contents.
    fn register_hits(&self, scene: &mut Scene) {
        let mut hit = HitTester::with_tolerance(self.settings.edge_tolerance);
        for block in &scene.blocks {
            if let Some(&pos) = scene.layout.node_coordinates.get(&block.addr) {
                block.register_hit_regions(pos, &mut hit);
            }
        }
        hit.set_edges(&scene.layout.edges);
        scene.hit = hit;
    }

    /// Row contents changed but no block moved.
    fn repaint_in_place(&mut self) {
        let mut scene = std::mem::take(&mut self.scene);
        self.register_hits(&mut scene);
        self.scene = scene;
        self.viewport.request_redraw();
    }

    /// Re-read labels, comments and strings. Returns true when a block
    /// changed size and the graph was laid out again.
    pub fn refresh(&mut self) -> bool {
        let mut resized = false;
        for block in &mut self.scene.blocks {
            resized |= block.refresh(&self.source);
        }
        if resized {
            self.relayout();
        } else {
            self.repaint_in_place();
        }
        resized
    }

    /// Lay the current blocks out again without rebuilding them.
    pub fn request_relayout(&mut self) {
        self.relayout();
    }

    fn relayout(&mut self) {
        let mut scene = std::mem::take(&mut self.scene);
        self.lay_out(&mut scene);
        self.scene = scene;
        self.viewport.request_redraw();
    }

    /// Center the function entry, or the whole graph when it fits.
    pub fn reset_view(&mut self) {
        let layout = &self.scene.layout;
        if layout.is_empty() {
            self.viewport.reset_view(Vec2::ZERO);
            return;
        }
        let bounds = layout.bounds;
        let size = self.viewport.size();
        if bounds.width() <= size.x && bounds.height() <= size.y {
            self.viewport.reset_view(bounds.center());
            return;
        }
        let entry = self.scene.graph.as_ref().map(|g| g.entry);
        let initial = entry
            .and_then(|entry| layout.node_rect(entry))
            .map(|rect| rect.center())
            .unwrap_or(bounds.center());
        self.viewport.reset_view(initial);
    }

    pub fn zoom_to_fit(&mut self) {
        if !self.scene.layout.is_empty() {
            self.viewport.zoom_to_fit(self.scene.layout.bounds);
        }
    }

    /// Scene rectangle of an instruction row.
    pub fn instruction_rect(&self, addr: Address) -> Option<Rect> {
        let block = self.scene.block_for_instruction(addr)?;
        let origin = *self.scene.layout.node_coordinates.get(&block.addr)?;
        let local = block.instruction_position(addr)?;
        let width = (block.size().x - local.x).max(0.0);
        Some(Rect::from_pos_size(
            origin + local,
            Vec2::new(width, self.options.metrics.line_height),
        ))
    }

    /// Select the instruction at `addr` and center it.
    pub fn navigate_to(&mut self, addr: Address) -> bool {
        if !self.contains_instruction(addr) {
            tracing::debug!("Cannot navigate to {}: not in the current graph", addr);
            return false;
        }
        self.selection.select_instruction(addr, true);
        self.show_instruction(addr)
    }

    pub fn show_instruction(&mut self, addr: Address) -> bool {
        match self.instruction_rect(addr) {
            Some(rect) => {
                self.viewport.center_on(rect.center());
                true
            }
            None => false,
        }
    }

    /// Center the first selected instruction.
    pub fn show_selected(&mut self) -> bool {
        match self.selection.selected_instructions().iter().next().copied() {
            Some(addr) => self.show_instruction(addr),
            None => false,
        }
    }

    /// Apply a label change. A rename patches the existing row in place;
    /// anything else rebuilds the scene.
    pub fn update_label(&mut self, addr: Address, is_renaming: bool) -> Result<(), ViewError> {
        if !is_renaming {
            return self.reload();
        }
        let Some(text) = self.source.label(addr) else {
            tracing::debug!("Label at {} was removed; reloading", addr);
            return self.reload();
        };
        let Some(block) = self.scene.block_for_instruction_mut(addr) else {
            return Err(report_invariant_violation(format!(
                "renamed label {} is not part of the displayed function",
                addr
            )));
        };
        if !block.has_label(addr) {
            return self.reload();
        }
        let before = block.size();
        block.update_label(addr, text)?;
        if block.size() != before {
            self.relayout();
        } else {
            self.repaint_in_place();
        }
        Ok(())
    }

    pub fn update_comment(&mut self, addr: Address, text: Option<String>) -> Result<(), ViewError> {
        let Some(block) = self.scene.block_for_instruction_mut(addr) else {
            tracing::debug!("No displayed instruction at {} for comment", addr);
            return Err(ViewError::lookup("instruction", addr));
        };
        let before = block.size();
        block.set_comment(addr, text)?;
        if block.size() != before {
            self.relayout();
        } else {
            self.repaint_in_place();
        }
        Ok(())
    }

    pub fn select_instruction(&mut self, addr: Address, unique: bool) -> bool {
        if !self.contains_instruction(addr) {
            tracing::debug!("Ignoring selection of {}: not displayed", addr);
            return false;
        }
        self.selection.select_instruction(addr, unique)
    }

    pub fn unselect_instruction(&mut self, addr: Address) -> bool {
        self.selection.unselect_instruction(addr)
    }

    pub fn unselect_all_instructions(&mut self) -> bool {
        self.selection.unselect_all_instructions()
    }

    pub fn select_operand(&mut self, addr: Address, index: usize, unique: bool) -> bool {
        let exists = self
            .scene
            .block_for_instruction(addr)
            .and_then(|block| block.instruction(addr))
            .is_some_and(|insn| index < insn.operands.len());
        if !exists {
            tracing::debug!("Ignoring selection of operand {} at {}: not displayed", index, addr);
            return false;
        }
        self.selection.select_operand(addr, index, unique)
    }

    pub fn unselect_operand(&mut self, addr: Address, index: usize) -> bool {
        self.selection.unselect_operand(addr, index)
    }

    pub fn unselect_all_operands(&mut self) -> bool {
        self.selection.unselect_all_operands()
    }

    /// What lies under a scene position.
    pub fn hit_test(&self, scene: Vec2) -> HitResult {
        self.scene.hit.hit_test(scene)
    }

    pub fn pointer_pressed(&mut self, screen: Vec2) {
        self.viewport.pointer_pressed(screen);
    }

    pub fn pointer_moved(&mut self, screen: Vec2) -> bool {
        self.viewport.pointer_moved(screen)
    }

    /// Finish a gesture. A click updates the selection and reports what was hit.
    pub fn pointer_released(&mut self, screen: Vec2) -> HitResult {
        let PointerOutcome::Click(scene) = self.viewport.pointer_released(screen) else {
            return HitResult::None;
        };
        let hit = self.hit_test(scene);
        match hit {
            HitResult::Operand { addr, index } => {
                self.selection.select_operand(addr, index, true);
            }
            HitResult::Instruction { addr, .. } => {
                self.selection.select_instruction(addr, true);
            }
            HitResult::Block(_) | HitResult::None => {
                self.selection.clear();
            }
            HitResult::Edge(_) => {}
        }
        hit
    }

    pub fn wheel(&mut self, steps: f32, anchor: Vec2) -> bool {
        self.viewport.wheel(steps, anchor)
    }

    pub fn resize(&mut self, size: Vec2) {
        self.viewport.resize(size);
    }

    /// Paint what the viewport shows. Returns the number of blocks painted.
    pub fn paint(&self, canvas: &mut dyn Canvas) -> usize {
        let scale = self.viewport.scale();
        let visible = self.viewport.visible_scene_rect().expand(CULL_MARGIN / scale);
        self.paint_scene(canvas, Some(visible), self.viewport.detail_level())
    }

    /// Paint the whole scene at full detail.
    pub fn paint_all(&self, canvas: &mut dyn Canvas) -> usize {
        self.paint_scene(canvas, None, DetailLevel::Full)
    }

    fn paint_scene(&self, canvas: &mut dyn Canvas, clip: Option<Rect>, detail: DetailLevel) -> usize {
        let theme = &self.settings.theme;
        let in_view = |rect: Rect| clip.is_none_or(|clip| rect.intersects(&clip));

        for edge in &self.scene.layout.edges {
            let Some(bounds) = Rect::bounding(edge.coordinates.iter().copied()) else {
                continue;
            };
            if !in_view(bounds.expand(1.0)) {
                continue;
            }
            let style = theme.edge_style(edge.class, detail == DetailLevel::Full);
            canvas.draw_polyline(&edge.coordinates, style.color, style.width);
            if style.arrow_head
                && let Some(end) = edge.end()
            {
                canvas.fill_polygon(&arrow_head(end, theme.arrow_size), style.color);
            }
        }

        let mut painted = 0;
        for block in &self.scene.blocks {
            let Some(rect) = self.scene.layout.node_rect(block.addr) else {
                continue;
            };
            if !in_view(rect) {
                continue;
            }
            block.paint(canvas, rect.min, theme, &self.selection, detail);
            painted += 1;
        }
        painted
    }

    /// Render the whole scene at scale 1 to an image file.
    pub fn save_image_to(&self, path: &Path, margins: f32) -> Result<PathBuf, ExportError> {
        let bounds = (!self.scene.layout.is_empty()).then_some(self.scene.layout.bounds);
        let text = TextRaster {
            font: self.font.clone(),
            font_size: self.settings.font_size,
            metrics: self.options.metrics,
        };
        let mut canvas = export::scene_canvas(bounds, margins, self.settings.theme.background, text)?;
        self.paint_all(&mut canvas);
        export::write_image(canvas, path)
    }
}

impl<S: AnalysisSource> NotificationListener for DisasmGraphView<S> {
    fn handle_notification(&mut self, notification: &Notification) {
        match notification {
            Notification::GraphUpdated { function } => {
                if self.function == Some(*function)
                    && let Err(e) = self.reload()
                {
                    tracing::warn!("Reload after graph update failed: {}", e);
                }
            }
            Notification::KnowledgeBaseUpdated => {
                self.refresh();
            }
            Notification::SelectedAddressChanged { addr: Some(addr) } => {
                self.select_instruction(*addr, true);
            }
            Notification::SelectedAddressChanged { addr: None } => {
                self.unselect_all_instructions();
            }
            Notification::SelectedOperandChanged {
                operand: Some((addr, index)),
            } => {
                self.select_operand(*addr, *index, true);
            }
            Notification::SelectedOperandChanged { operand: None } => {
                self.unselect_all_operands();
            }
            Notification::LabelRenamed { addr } => {
                if !self.contains_instruction(*addr) {
                    tracing::debug!("Label {} renamed outside the displayed function", addr);
                } else if let Err(e) = self.update_label(*addr, true) {
                    tracing::warn!("Label update failed: {}", e);
                }
            }
            Notification::CommentChanged { addr, text } => {
                if self.contains_instruction(*addr)
                    && let Err(e) = self.update_comment(*addr, text.clone())
                {
                    tracing::warn!("Comment update failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{BasicBlock, Instruction, ProgramSnapshot, Terminator};
    use blockview_graph::SelectionQuery;

    fn diamond() -> ProgramSnapshot {
        let graph = FunctionGraph {
            function: Address(0x100),
            entry: Address(0x100),
            blocks: vec![
                BasicBlock::new(
                    0x100,
                    vec![Instruction::new(0x100, "cmp", &["eax", "0"]), Instruction::new(0x104, "je", &["0x120"])],
                    Terminator::Conditional {
                        taken: Address(0x120),
                        fallthrough: Address(0x110),
                    },
                ),
                BasicBlock::new(
                    0x110,
                    vec![Instruction::new(0x110, "mov", &["eax", "1"])],
                    Terminator::Fallthrough { next: Address(0x130) },
                ),
                BasicBlock::new(
                    0x120,
                    vec![Instruction::new(0x120, "mov", &["eax", "2"])],
                    Terminator::Fallthrough { next: Address(0x130) },
                ),
                BasicBlock::new(0x130, vec![Instruction::new(0x130, "ret", &[])], Terminator::Return),
            ],
            edges: vec![
                (Address(0x100), Address(0x120)),
                (Address(0x100), Address(0x110)),
                (Address(0x110), Address(0x130)),
                (Address(0x120), Address(0x130)),
            ],
        };
        ProgramSnapshot::new().with_function(graph)
    }

    fn view() -> DisasmGraphView<ProgramSnapshot> {
        let mut view = DisasmGraphView::new(diamond(), ViewSettings::default(), Vec2::new(800.0, 600.0));
        view.set_function(Address(0x100)).unwrap();
        view
    }

    #[test]
    fn test_scene_contents() {
        let view = view();
        assert_eq!(view.blocks().len(), 4);
        assert_eq!(view.layout().edges.len(), 4);
        assert!(view.contains_instruction(Address(0x104)));
        assert_eq!(view.block(Address(0x130)).map(|b| b.addr), Some(Address(0x130)));
        assert!(view.layout().edges.iter().all(|e| !e.is_back_edge()));
    }

    #[test]
    fn test_missing_function_clears_scene() {
        let mut view = view();
        view.select_instruction(Address(0x100), true);
        let err = view.set_function(Address(0x999)).unwrap_err();
        assert_eq!(err, ViewError::lookup("function", Address(0x999)));
        assert!(view.blocks().is_empty());
        assert!(view.layout().is_empty());
        assert!(view.selection().is_empty());
    }

    #[test]
    fn test_selection_ignores_foreign_addresses() {
        let mut view = view();
        assert!(!view.select_instruction(Address(0x5000), true));
        assert!(!view.select_operand(Address(0x100), 7, true));
        assert!(view.select_operand(Address(0x100), 1, true));
    }

    #[test]
    fn test_navigate_centers_instruction() {
        let mut view = view();
        assert!(view.navigate_to(Address(0x130)));
        let rect = view.instruction_rect(Address(0x130)).unwrap();
        assert!(view.viewport().center().distance(rect.center()) < 1e-2);
        assert!(view.selection().is_instruction_selected(Address(0x130)));
        assert!(!view.navigate_to(Address(0xdead)));
    }

    #[test]
    fn test_click_selects_and_empty_click_clears() {
        let mut view = view();
        let rect = view.instruction_rect(Address(0x110)).unwrap();
        let screen = view.viewport().scene_to_screen(rect.min + Vec2::new(2.0, 2.0));
        view.pointer_pressed(screen);
        let hit = view.pointer_released(screen);
        assert!(matches!(hit, HitResult::Instruction { addr: Address(0x110), .. }));
        assert!(view.selection().is_instruction_selected(Address(0x110)));

        let far = view.viewport().scene_to_screen(view.layout().bounds.max + Vec2::new(500.0, 500.0));
        view.pointer_pressed(far);
        assert_eq!(view.pointer_released(far), HitResult::None);
        assert!(view.selection().is_empty());
    }

    #[test]
    fn test_empty_click_requests_one_redraw() {
        let mut view = view();
        view.select_instruction(Address(0x110), true);
        view.select_operand(Address(0x100), 1, true);
        let redraws = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = std::rc::Rc::clone(&redraws);
        let _sub = view.viewport().subscribe_redraw(move |_| counter.set(counter.get() + 1));

        let far = view.viewport().scene_to_screen(view.layout().bounds.max + Vec2::new(500.0, 500.0));
        view.pointer_pressed(far);
        assert_eq!(view.pointer_released(far), HitResult::None);
        assert!(view.selection().is_empty());
        assert_eq!(redraws.get(), 1);

        view.pointer_pressed(far);
        view.pointer_released(far);
        assert_eq!(redraws.get(), 1);
    }

    fn view_with_foreign_label() -> DisasmGraphView<ProgramSnapshot> {
        let mut snapshot = diamond();
        snapshot.rename_label(Address(0x5000), "elsewhere");
        let mut view = DisasmGraphView::new(snapshot, ViewSettings::default(), Vec2::new(800.0, 600.0));
        view.set_function(Address(0x100)).unwrap();
        view
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not part of the displayed function")]
    fn test_foreign_label_rename_is_fatal_in_debug() {
        let mut view = view_with_foreign_label();
        let _ = view.update_label(Address(0x5000), true);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_foreign_label_rename_is_reported_in_release() {
        let mut view = view_with_foreign_label();
        let result = view.update_label(Address(0x5000), true);
        assert!(matches!(result, Err(ViewError::InvariantViolation(_))));
        assert_eq!(view.blocks().len(), 4);
    }

    #[test]
    fn test_silhouette_paint_has_no_text() {
        let mut view = view();
        let mut list = blockview_graph::DisplayList::new();
        view.paint(&mut list);
        assert!(list.texts().any(|t| t == "ret"));

        view.viewport_mut().zoom(0.1, Vec2::new(400.0, 300.0));
        list.clear();
        view.paint(&mut list);
        assert_eq!(list.texts().count(), 0);
        assert!(
            !list
                .commands
                .iter()
                .any(|c| matches!(c, blockview_graph::DrawCommand::Polygon { .. }))
        );
    }
}
