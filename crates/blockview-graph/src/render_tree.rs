//! Per-block render tree.
//!
//! A [`BlockModel`] owns the rows of one basic block: labels, phi variables,
//! variables and instructions. Every row measures itself lazily and keeps
//! the result until something invalidates it explicitly.

use crate::hit_tester::HitTester;
use crate::metrics::FontMetrics;
use crate::style::{Color, Theme};
use blockview_core::{
    report_invariant_violation, Address, AnalysisSource, BasicBlock, Instruction, Rect, Vec2, ViewError,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;

/// Drawing surface in scene units.
pub trait Canvas {
    fn fill_rect(&mut self, rect: Rect, color: Color);
    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);
    /// `pos` is the top-left corner of the text row.
    fn draw_text(&mut self, pos: Vec2, text: &str, color: Color);
    fn draw_polyline(&mut self, points: &[Vec2], color: Color, width: f32);
    fn fill_polygon(&mut self, points: &[Vec2], color: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, color: Color },
    StrokeRect { rect: Rect, color: Color, width: f32 },
    Text { pos: Vec2, text: String, color: Color },
    Polyline { points: Vec<Vec2>, color: Color, width: f32 },
    Polygon { points: Vec<Vec2>, color: Color },
}

/// Canvas that records commands instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&[Vec2], Color)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Polyline { points, color, .. } => Some((points.as_slice(), *color)),
            _ => None,
        })
    }
}

impl Canvas for DisplayList {
    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.commands.push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn draw_text(&mut self, pos: Vec2, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text {
            pos,
            text: text.to_string(),
            color,
        });
    }

    fn draw_polyline(&mut self, points: &[Vec2], color: Color, width: f32) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color,
            width,
        });
    }

    fn fill_polygon(&mut self, points: &[Vec2], color: Color) {
        self.commands.push(DrawCommand::Polygon {
            points: points.to_vec(),
            color,
        });
    }
}

/// Answers "is this highlighted?" while painting.
pub trait SelectionQuery {
    fn is_instruction_selected(&self, addr: Address) -> bool;
    fn is_operand_selected(&self, addr: Address, index: usize) -> bool;
}

impl SelectionQuery for () {
    fn is_instruction_selected(&self, _addr: Address) -> bool {
        false
    }

    fn is_operand_selected(&self, _addr: Address, _index: usize) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailLevel {
    Full,
    /// Blocks only, no text or arrowheads.
    Silhouette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockMode {
    #[default]
    Graph,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub metrics: FontMetrics,
    pub show_address: bool,
    pub mode: BlockMode,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            metrics: FontMetrics::default(),
            show_address: true,
            mode: BlockMode::Graph,
        }
    }
}

/// What a point inside a block row refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementHit {
    Instruction(Address),
    Operand { addr: Address, index: usize },
}

#[derive(Debug, Clone, Default)]
struct SizeCache(Cell<Option<Vec2>>);

impl SizeCache {
    fn get_or(&self, compute: impl FnOnce() -> Vec2) -> Vec2 {
        if let Some(size) = self.0.get() {
            return size;
        }
        let size = compute();
        self.0.set(Some(size));
        size
    }

    fn clear(&self) {
        self.0.set(None);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperandElement {
    pub index: usize,
    pub text: String,
    pub is_branch_target: bool,
    pub variable: Option<String>,
}

/// Horizontal placement of the pieces of one instruction row, relative to
/// the row origin.
#[derive(Debug, Clone, PartialEq)]
struct RowLayout {
    addr_x: Option<f32>,
    mnemonic_x: f32,
    operands: Vec<(f32, f32)>,
    commas: Vec<f32>,
    annotation_x: Option<f32>,
    width: f32,
}

#[derive(Debug, Clone)]
pub struct InstructionElement {
    pub addr: Address,
    pub mnemonic: String,
    pub operands: Vec<OperandElement>,
    pub comment: Option<String>,
    pub string: Option<String>,
    addr_text: String,
    size: SizeCache,
}

impl InstructionElement {
    pub const ADDR_SPACING: f32 = 20.0;
    pub const MNEMONIC_SPACING: f32 = 10.0;
    pub const OPERAND_SPACING: f32 = 2.0;
    pub const ANNOTATION_SPACING: f32 = 5.0;
    pub const LINEAR_ADDR_OFFSET: f32 = 120.0;

    pub fn new(insn: &Instruction, comment: Option<String>, string: Option<String>) -> Self {
        let branch_kind = matches!(
            insn.kind,
            blockview_core::InstructionKind::Branch | blockview_core::InstructionKind::Call
        );
        let operands = insn
            .operands
            .iter()
            .enumerate()
            .map(|(index, operand)| OperandElement {
                index,
                text: operand.text.clone(),
                is_branch_target: branch_kind && insn.is_branch_target_operand(index),
                variable: operand.variable.clone(),
            })
            .collect();

        Self {
            addr: insn.addr,
            mnemonic: insn.mnemonic.clone(),
            operands,
            comment,
            string,
            addr_text: insn.addr.to_string(),
            size: SizeCache::default(),
        }
    }

    /// Comments win over string references.
    pub fn annotation(&self) -> Option<&str> {
        self.comment.as_deref().or(self.string.as_deref())
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
        self.size.clear();
    }

    fn row_layout(&self, options: &RenderOptions) -> RowLayout {
        let metrics = &options.metrics;
        let mut x = 0.0;

        let addr_x = if options.show_address {
            let start = x;
            x += metrics.text_width(&self.addr_text);
            x += match options.mode {
                BlockMode::Graph => Self::ADDR_SPACING,
                BlockMode::Linear => Self::LINEAR_ADDR_OFFSET,
            };
            Some(start)
        } else {
            None
        };

        let mnemonic_x = x;
        x += metrics.text_width(&self.mnemonic) + Self::MNEMONIC_SPACING;

        let mut operands = Vec::with_capacity(self.operands.len());
        let mut commas = Vec::new();
        for (i, operand) in self.operands.iter().enumerate() {
            let width = metrics.text_width(&operand.text);
            operands.push((x, width));
            x += width;
            if i + 1 != self.operands.len() {
                commas.push(x);
                x += metrics.char_width;
            }
            x += Self::OPERAND_SPACING;
        }

        let annotation_x = self.annotation().map(|text| {
            x += Self::ANNOTATION_SPACING;
            let start = x;
            x += metrics.text_width(text);
            start
        });

        RowLayout {
            addr_x,
            mnemonic_x,
            operands,
            commas,
            annotation_x,
            width: x,
        }
    }

    fn measure(&self, options: &RenderOptions) -> Vec2 {
        self.size
            .get_or(|| Vec2::new(self.row_layout(options).width, options.metrics.line_height))
    }

    /// Scene rect of operand `index` for a row drawn at `origin`.
    pub fn operand_rect(&self, origin: Vec2, index: usize, options: &RenderOptions) -> Option<Rect> {
        let layout = self.row_layout(options);
        let &(x, width) = layout.operands.get(index)?;
        Some(Rect::from_pos_size(
            Vec2::new(origin.x + x, origin.y),
            Vec2::new(width, options.metrics.line_height),
        ))
    }

    fn paint(
        &self,
        canvas: &mut dyn Canvas,
        origin: Vec2,
        options: &RenderOptions,
        theme: &Theme,
        selection: &dyn SelectionQuery,
    ) {
        let layout = self.row_layout(options);
        let line_height = options.metrics.line_height;

        if selection.is_instruction_selected(self.addr) {
            canvas.fill_rect(
                Rect::from_pos_size(origin, Vec2::new(layout.width, line_height)),
                theme.selected_instruction,
            );
        }

        let at = |x: f32| Vec2::new(origin.x + x, origin.y);
        if let Some(x) = layout.addr_x {
            canvas.draw_text(at(x), &self.addr_text, theme.address_text);
        }
        canvas.draw_text(at(layout.mnemonic_x), &self.mnemonic, theme.mnemonic_text);

        for (operand, &(x, width)) in self.operands.iter().zip(&layout.operands) {
            if selection.is_operand_selected(self.addr, operand.index) {
                canvas.fill_rect(
                    Rect::from_pos_size(at(x), Vec2::new(width, line_height)),
                    theme.selected_operand,
                );
            }
            let color = if operand.is_branch_target {
                theme.branch_target_text
            } else if operand.variable.is_some() {
                theme.variable_text
            } else {
                theme.operand_text
            };
            canvas.draw_text(at(x), &operand.text, color);
        }
        for &x in &layout.commas {
            canvas.draw_text(at(x), ",", theme.operand_text);
        }

        if let Some(x) = layout.annotation_x {
            let (text, color) = match (&self.comment, &self.string) {
                (Some(comment), _) => (comment.as_str(), theme.comment_text),
                (None, Some(string)) => (string.as_str(), theme.string_text),
                (None, None) => return,
            };
            canvas.draw_text(at(x), text, color);
        }
    }

    fn hit_test(&self, local: Vec2, options: &RenderOptions) -> ElementHit {
        let layout = self.row_layout(options);
        for (operand, &(x, width)) in self.operands.iter().zip(&layout.operands) {
            if local.x >= x && local.x < x + width {
                return ElementHit::Operand {
                    addr: self.addr,
                    index: operand.index,
                };
            }
        }
        ElementHit::Instruction(self.addr)
    }
}

#[derive(Debug, Clone)]
pub struct LabelElement {
    pub addr: Address,
    pub text: String,
    size: SizeCache,
}

impl LabelElement {
    pub fn new(addr: Address, text: String) -> Self {
        Self {
            addr,
            text,
            size: SizeCache::default(),
        }
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.size.clear();
    }
}

#[derive(Debug, Clone)]
pub struct PhiVariableElement {
    pub name: String,
    pub sources: Vec<String>,
    size: SizeCache,
}

impl PhiVariableElement {
    fn text(&self) -> String {
        format!("{} = \u{03c6}({})", self.name, self.sources.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct VariableElement {
    pub name: String,
    pub type_name: Option<String>,
    size: SizeCache,
}

impl VariableElement {
    fn text(&self) -> String {
        match &self.type_name {
            Some(ty) => format!("{ty} {}", self.name),
            None => self.name.clone(),
        }
    }
}

/// One row of a block.
#[derive(Debug, Clone)]
pub enum RenderElement {
    Instruction(InstructionElement),
    Label(LabelElement),
    PhiVariable(PhiVariableElement),
    Variable(VariableElement),
}

impl RenderElement {
    pub fn measure(&self, options: &RenderOptions) -> Vec2 {
        let metrics = &options.metrics;
        let text_row = |cache: &SizeCache, text: &dyn Fn() -> String| {
            cache.get_or(|| Vec2::new(metrics.text_width(&text()), metrics.line_height))
        };
        match self {
            Self::Instruction(insn) => insn.measure(options),
            Self::Label(label) => text_row(&label.size, &|| label.text.clone()),
            Self::PhiVariable(phi) => text_row(&phi.size, &|| phi.text()),
            Self::Variable(var) => text_row(&var.size, &|| var.text()),
        }
    }

    pub fn invalidate(&self) {
        match self {
            Self::Instruction(insn) => insn.size.clear(),
            Self::Label(label) => label.size.clear(),
            Self::PhiVariable(phi) => phi.size.clear(),
            Self::Variable(var) => var.size.clear(),
        }
    }

    pub fn paint(
        &self,
        canvas: &mut dyn Canvas,
        origin: Vec2,
        options: &RenderOptions,
        theme: &Theme,
        selection: &dyn SelectionQuery,
    ) {
        match self {
            Self::Instruction(insn) => insn.paint(canvas, origin, options, theme, selection),
            Self::Label(label) => canvas.draw_text(origin, &label.text, theme.label_text),
            Self::PhiVariable(phi) => canvas.draw_text(origin, &phi.text(), theme.variable_text),
            Self::Variable(var) => canvas.draw_text(origin, &var.text(), theme.variable_text),
        }
    }

    /// `local` is relative to the row origin.
    pub fn hit_test(&self, local: Vec2, options: &RenderOptions) -> Option<ElementHit> {
        match self {
            Self::Instruction(insn) => Some(insn.hit_test(local, options)),
            _ => None,
        }
    }
}

/// Render tree of one basic block.
#[derive(Debug, Clone)]
pub struct BlockModel {
    pub addr: Address,
    block: BasicBlock,
    options: RenderOptions,
    elements: Vec<RenderElement>,
    addr_to_insn: HashMap<Address, usize>,
    addr_to_label: HashMap<Address, usize>,
    size: SizeCache,
}

impl BlockModel {
    pub const TOP_PADDING: f32 = 5.0;
    pub const BOTTOM_PADDING: f32 = 5.0;
    pub const GRAPH_LEFT_PADDING: f32 = 10.0;
    pub const RIGHT_PADDING: f32 = 10.0;

    pub fn build(block: &BasicBlock, source: &dyn AnalysisSource, options: RenderOptions) -> Self {
        let mut model = Self {
            addr: block.addr,
            block: block.clone(),
            options,
            elements: Vec::new(),
            addr_to_insn: HashMap::new(),
            addr_to_label: HashMap::new(),
            size: SizeCache::default(),
        };
        model.populate(source);
        model
    }

    fn push_label(&mut self, addr: Address, source: &dyn AnalysisSource) {
        if let Some(text) = source.label(addr) {
            self.addr_to_label.insert(addr, self.elements.len());
            self.elements.push(RenderElement::Label(LabelElement::new(addr, text)));
        }
    }

    fn populate(&mut self, source: &dyn AnalysisSource) {
        self.elements.clear();
        self.addr_to_insn.clear();
        self.addr_to_label.clear();
        self.size.clear();

        let block_addr = self.addr;
        self.push_label(block_addr, source);

        let phis: Vec<RenderElement> = self
            .block
            .phi_variables
            .iter()
            .filter(|phi| !phi.register)
            .map(|phi| {
                RenderElement::PhiVariable(PhiVariableElement {
                    name: phi.name.clone(),
                    sources: phi.sources.clone(),
                    size: SizeCache::default(),
                })
            })
            .collect();
        self.elements.extend(phis);

        let variables: Vec<RenderElement> = self
            .block
            .variables
            .iter()
            .map(|var| {
                RenderElement::Variable(VariableElement {
                    name: var.name.clone(),
                    type_name: var.type_name.clone(),
                    size: SizeCache::default(),
                })
            })
            .collect();
        self.elements.extend(variables);

        let instructions = std::mem::take(&mut self.block.instructions);
        for insn in &instructions {
            if insn.addr != block_addr {
                self.push_label(insn.addr, source);
            }
            let element = InstructionElement::new(insn, source.comment(insn.addr), source.string_reference(insn.addr));
            self.addr_to_insn.insert(insn.addr, self.elements.len());
            self.elements.push(RenderElement::Instruction(element));
        }
        self.block.instructions = instructions;
    }

    pub fn elements(&self) -> &[RenderElement] {
        &self.elements
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        if self.options != options {
            self.options = options;
            self.invalidate();
        }
    }

    pub fn contains_instruction(&self, addr: Address) -> bool {
        self.addr_to_insn.contains_key(&addr)
    }

    pub fn instruction_addrs(&self) -> impl Iterator<Item = Address> + '_ {
        self.block.instructions.iter().map(|insn| insn.addr)
    }

    pub fn instruction(&self, addr: Address) -> Option<&InstructionElement> {
        match self.elements.get(*self.addr_to_insn.get(&addr)?) {
            Some(RenderElement::Instruction(insn)) => Some(insn),
            _ => None,
        }
    }

    pub fn has_label(&self, addr: Address) -> bool {
        self.addr_to_label.contains_key(&addr)
    }

    fn content_origin(&self) -> Vec2 {
        match self.options.mode {
            BlockMode::Graph => Vec2::new(Self::GRAPH_LEFT_PADDING, Self::TOP_PADDING),
            BlockMode::Linear => Vec2::ZERO,
        }
    }

    /// Offset of row `index` from the block's top-left corner.
    fn row_offset(&self, index: usize) -> Vec2 {
        let origin = self.content_origin();
        Vec2::new(origin.x, origin.y + index as f32 * self.options.metrics.line_height)
    }

    pub fn size(&self) -> Vec2 {
        self.size.get_or(|| {
            let rows = self.elements.len() as f32;
            let widest = self
                .elements
                .iter()
                .map(|e| e.measure(&self.options).x)
                .fold(0.0, f32::max);
            let mut width = widest + Self::RIGHT_PADDING;
            let mut height = rows * self.options.metrics.line_height;
            if self.options.mode == BlockMode::Graph {
                width += Self::GRAPH_LEFT_PADDING;
                height += Self::TOP_PADDING + Self::BOTTOM_PADDING;
            }
            Vec2::new(width, height)
        })
    }

    /// Drop every cached size in the block.
    pub fn invalidate(&self) {
        for element in &self.elements {
            element.invalidate();
        }
        self.size.clear();
    }

    /// Position of an instruction row relative to the block's top-left corner.
    pub fn instruction_position(&self, addr: Address) -> Option<Vec2> {
        self.addr_to_insn.get(&addr).map(|&index| self.row_offset(index))
    }

    pub fn set_comment(&mut self, addr: Address, text: Option<String>) -> Result<(), ViewError> {
        let index = *self
            .addr_to_insn
            .get(&addr)
            .ok_or_else(|| ViewError::lookup("instruction", addr))?;
        if let Some(RenderElement::Instruction(insn)) = self.elements.get_mut(index) {
            insn.set_comment(text);
        }
        self.size.clear();
        Ok(())
    }

    /// Replace the text of an existing label row.
    pub fn update_label(&mut self, addr: Address, text: String) -> Result<(), ViewError> {
        let Some(&index) = self.addr_to_label.get(&addr) else {
            return Err(report_invariant_violation(format!(
                "label at {} is not part of block {}",
                addr, self.addr
            )));
        };
        if let Some(RenderElement::Label(label)) = self.elements.get_mut(index) {
            label.set_text(text);
        }
        self.size.clear();
        Ok(())
    }

    /// Re-read labels, comments and strings. Returns true when the block size changed.
    pub fn refresh(&mut self, source: &dyn AnalysisSource) -> bool {
        let before = self.size();
        self.populate(source);
        self.size() != before
    }

    pub fn paint(
        &self,
        canvas: &mut dyn Canvas,
        origin: Vec2,
        theme: &Theme,
        selection: &dyn SelectionQuery,
        detail: DetailLevel,
    ) {
        let rect = Rect::from_pos_size(origin, self.size());
        if self.options.mode == BlockMode::Graph {
            let fill = match detail {
                DetailLevel::Full => theme.block_fill,
                DetailLevel::Silhouette => theme.block_silhouette,
            };
            canvas.fill_rect(rect, fill);
            canvas.stroke_rect(rect, theme.block_border, 1.5);
        }
        if detail == DetailLevel::Silhouette {
            return;
        }
        for (index, element) in self.elements.iter().enumerate() {
            element.paint(canvas, origin + self.row_offset(index), &self.options, theme, selection);
        }
    }

    /// Row hit at `local`, relative to the block's top-left corner.
    pub fn hit_test(&self, local: Vec2) -> Option<ElementHit> {
        let line_height = self.options.metrics.line_height;
        let content = self.content_origin();
        if line_height <= 0.0 || local.y < content.y || local.x < content.x {
            return None;
        }
        let index = ((local.y - content.y) / line_height) as usize;
        let element = self.elements.get(index)?;
        let row = self.row_offset(index);
        element.hit_test(local - row, &self.options)
    }

    /// Add the block, its instruction rows and operands to `hit`.
    pub fn register_hit_regions(&self, origin: Vec2, hit: &mut HitTester) {
        hit.add_block(self.addr, Rect::from_pos_size(origin, self.size()));
        let line_height = self.options.metrics.line_height;
        for (index, element) in self.elements.iter().enumerate() {
            let RenderElement::Instruction(insn) = element else {
                continue;
            };
            let row = origin + self.row_offset(index);
            let width = insn.measure(&self.options).x;
            hit.add_instruction(self.addr, insn.addr, Rect::from_pos_size(row, Vec2::new(width, line_height)));
            for operand in &insn.operands {
                if let Some(rect) = insn.operand_rect(row, operand.index, &self.options) {
                    hit.add_operand(insn.addr, operand.index, rect);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockview_core::{FunctionGraph, PhiVariable, ProgramSnapshot, Terminator, Variable};

    fn sample_block() -> BasicBlock {
        let mut jmp = Instruction::new(0x1008, "jne", &["0x1020"]);
        jmp.kind = blockview_core::InstructionKind::Branch;
        jmp.branch_target_operand = Some(0);
        let mut block = BasicBlock::new(
            0x1000,
            vec![Instruction::new(0x1000, "mov", &["eax", "1"]), Instruction::new(0x1004, "cmp", &["eax", "ebx"]), jmp],
            Terminator::Conditional {
                taken: Address(0x1020),
                fallthrough: Address(0x100c),
            },
        );
        block.phi_variables = vec![
            PhiVariable {
                name: "v1".into(),
                sources: vec!["v0".into(), "v2".into()],
                register: false,
            },
            PhiVariable {
                name: "r1".into(),
                sources: vec!["r0".into()],
                register: true,
            },
        ];
        block.variables = vec![Variable {
            name: "counter".into(),
            type_name: Some("int".into()),
        }];
        block
    }

    fn sample_source() -> ProgramSnapshot {
        let mut snapshot = ProgramSnapshot::new().with_function(FunctionGraph {
            function: Address(0x1000),
            entry: Address(0x1000),
            blocks: vec![sample_block()],
            edges: Vec::new(),
        });
        snapshot.rename_label(Address(0x1000), "main");
        snapshot.rename_label(Address(0x1004), "inner");
        snapshot.set_comment(Address(0x1000), Some("init".into()));
        snapshot
    }

    fn options() -> RenderOptions {
        RenderOptions {
            metrics: FontMetrics {
                char_width: 10.0,
                line_height: 20.0,
                ascent: 15.0,
            },
            show_address: true,
            mode: BlockMode::Graph,
        }
    }

    #[test]
    fn test_rows_in_display_order() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        let kinds: Vec<&str> = block
            .elements()
            .iter()
            .map(|e| match e {
                RenderElement::Instruction(_) => "insn",
                RenderElement::Label(_) => "label",
                RenderElement::PhiVariable(_) => "phi",
                RenderElement::Variable(_) => "var",
            })
            .collect();
        // Register phi variables are hidden.
        assert_eq!(kinds, vec!["label", "phi", "var", "insn", "label", "insn", "insn"]);
    }

    #[test]
    fn test_instruction_row_width() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        let insn = block.instruction(Address(0x1000)).unwrap();
        // "00001000" + 20, "mov" + 10, "eax" "," + 2, "1" + 2, 5 + "init"
        let expected = 80.0 + 20.0 + 30.0 + 10.0 + 30.0 + 10.0 + 2.0 + 10.0 + 2.0 + 5.0 + 40.0;
        assert_eq!(RenderElement::Instruction(insn.clone()).measure(&options()).x, expected);
    }

    #[test]
    fn test_block_size_includes_padding() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        let size = block.size();
        assert_eq!(size.y, 7.0 * 20.0 + 10.0);
        let widest = block
            .elements()
            .iter()
            .map(|e| e.measure(&options()).x)
            .fold(0.0, f32::max);
        assert_eq!(size.x, widest + 20.0);
    }

    #[test]
    fn test_linear_mode_has_no_padding() {
        let mut opts = options();
        opts.mode = BlockMode::Linear;
        let block = BlockModel::build(&sample_block(), &sample_source(), opts);
        assert_eq!(block.size().y, 7.0 * 20.0);
        assert_eq!(block.instruction_position(Address(0x1000)), Some(Vec2::new(0.0, 60.0)));
    }

    #[test]
    fn test_instruction_position() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        assert_eq!(block.instruction_position(Address(0x1000)), Some(Vec2::new(10.0, 5.0 + 60.0)));
        assert_eq!(block.instruction_position(Address(0x1008)), Some(Vec2::new(10.0, 5.0 + 120.0)));
        assert_eq!(block.instruction_position(Address(0x2000)), None);
    }

    #[test]
    fn test_set_comment_invalidates_size() {
        let mut block = BlockModel::build(&sample_block(), &sample_source(), options());
        let before = block.size();
        block
            .set_comment(Address(0x1008), Some("a much longer comment than before".into()))
            .unwrap();
        assert!(block.size().x > before.x);

        let missing = block.set_comment(Address(0x9999), None);
        assert!(matches!(missing, Err(ViewError::LookupFailure { .. })));
    }

    #[test]
    fn test_update_label_changes_text() {
        let mut block = BlockModel::build(&sample_block(), &sample_source(), options());
        block.update_label(Address(0x1004), "renamed_loop_head".into()).unwrap();
        let texts: Vec<String> = block
            .elements()
            .iter()
            .filter_map(|e| match e {
                RenderElement::Label(label) => Some(label.text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["main".to_string(), "renamed_loop_head".to_string()]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "is not part of block")]
    fn test_update_label_without_label_row_is_fatal_in_debug() {
        let mut block = BlockModel::build(&sample_block(), &sample_source(), options());
        let _ = block.update_label(Address(0x1008), "nowhere".into());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_update_label_without_label_row_is_reported_in_release() {
        let mut block = BlockModel::build(&sample_block(), &sample_source(), options());
        let result = block.update_label(Address(0x1008), "nowhere".into());
        assert!(matches!(result, Err(ViewError::InvariantViolation(_))));
    }

    #[test]
    fn test_refresh_reports_size_change() {
        let mut source = sample_source();
        let mut block = BlockModel::build(&sample_block(), &source, options());
        assert!(!block.refresh(&source));

        source.set_comment(Address(0x1008), Some("loop back to the very top of main".into()));
        assert!(block.refresh(&source));
        assert_eq!(
            block.instruction(Address(0x1008)).unwrap().comment.as_deref(),
            Some("loop back to the very top of main")
        );
    }

    #[test]
    fn test_hit_test_operand_and_row() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        // Row 3 is "mov eax, 1". Operand "eax" starts at 80 + 20 + 30 + 10 = 140.
        let row_y = 5.0 + 3.0 * 20.0 + 2.0;
        assert_eq!(
            block.hit_test(Vec2::new(10.0 + 145.0, row_y)),
            Some(ElementHit::Operand {
                addr: Address(0x1000),
                index: 0
            })
        );
        assert_eq!(
            block.hit_test(Vec2::new(10.0 + 5.0, row_y)),
            Some(ElementHit::Instruction(Address(0x1000)))
        );
        // Label rows are not selectable.
        assert_eq!(block.hit_test(Vec2::new(15.0, 7.0)), None);
    }

    #[test]
    fn test_silhouette_paints_no_text() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        let mut list = DisplayList::new();
        block.paint(&mut list, Vec2::ZERO, &Theme::default(), &(), DetailLevel::Silhouette);
        assert_eq!(list.texts().count(), 0);
        assert!(list.commands.iter().any(|cmd| matches!(
            cmd,
            DrawCommand::FillRect { color, .. } if *color == Theme::default().block_silhouette
        )));

        list.clear();
        block.paint(&mut list, Vec2::ZERO, &Theme::default(), &(), DetailLevel::Full);
        let texts: Vec<&str> = list.texts().collect();
        assert!(texts.contains(&"main"));
        assert!(texts.contains(&"jne"));
        assert!(texts.contains(&"init"));
        assert!(texts.contains(&"v1 = \u{03c6}(v0, v2)"));
    }

    struct SelectAll;

    impl SelectionQuery for SelectAll {
        fn is_instruction_selected(&self, _addr: Address) -> bool {
            true
        }

        fn is_operand_selected(&self, _addr: Address, _index: usize) -> bool {
            false
        }
    }

    #[test]
    fn test_selected_rows_are_highlighted() {
        let block = BlockModel::build(&sample_block(), &sample_source(), options());
        let mut list = DisplayList::new();
        block.paint(&mut list, Vec2::ZERO, &Theme::default(), &SelectAll, DetailLevel::Full);
        let highlights = list
            .commands
            .iter()
            .filter(|cmd| matches!(
                cmd,
                DrawCommand::FillRect { color, .. } if *color == Theme::default().selected_instruction
            ))
            .count();
        assert_eq!(highlights, 3);
    }
}
