//! 题号面板：区分"未访问 / 已访问未作答 / 已作答"

use std::collections::BTreeSet;

use crate::models::{AnswerRecord, QuestionSet};

/// 访问过的题目下标，仅用于面板着色，可随时重建
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitLedger(BTreeSet<usize>);

impl VisitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit(&mut self, index: usize) {
        self.0.insert(index);
    }

    pub fn is_visited(&self, index: usize) -> bool {
        self.0.contains(&index)
    }
}

/// 三种状态互斥且覆盖全部题目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteStatus {
    Unvisited,
    VisitedUnanswered,
    Answered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    pub index: usize,
    pub status: PaletteStatus,
    pub current: bool,
}

/// 作答优先于访问记录
pub fn classify(index: usize, questions: &QuestionSet, answers: &AnswerRecord, ledger: &VisitLedger) -> PaletteStatus {
    let answered = questions
        .get(index)
        .map(|q| answers.is_answered(q.id))
        .unwrap_or(false);
    if answered {
        PaletteStatus::Answered
    } else if ledger.is_visited(index) {
        PaletteStatus::VisitedUnanswered
    } else {
        PaletteStatus::Unvisited
    }
}

pub fn build_palette(
    questions: &QuestionSet,
    answers: &AnswerRecord,
    ledger: &VisitLedger,
    current: usize,
) -> Vec<PaletteEntry> {
    (0..questions.len())
        .map(|index| PaletteEntry {
            index,
            status: classify(index, questions, answers, ledger),
            current: index == current,
        })
        .collect()
}
