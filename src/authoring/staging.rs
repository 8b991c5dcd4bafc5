// src/authoring/staging.rs

use std::collections::HashSet;

use serde::Serialize;

use crate::{
    error::AppError,
    models::question::{NewQuestion, QuestionOption, QuestionRecord, QuestionType, StagedQuestion},
};

/// The question form currently being edited.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub options: Vec<QuestionOption>,
    pub correct_option_ids: Vec<String>,
    /// Id of the staged question this draft will replace on commit.
    pub editing: Option<String>,
}

impl Default for DraftQuestion {
    fn default() -> Self {
        Self {
            question_text: String::new(),
            question_type: QuestionType::Single,
            options: vec![QuestionOption::new(""), QuestionOption::new("")],
            correct_option_ids: Vec::new(),
            editing: None,
        }
    }
}

impl DraftQuestion {
    /// Switching to `single` keeps at most the first selected answer.
    pub fn set_question_type(&mut self, question_type: QuestionType) {
        self.question_type = question_type;
        if question_type == QuestionType::Single {
            self.correct_option_ids.truncate(1);
        }
    }

    /// Appends an empty option and returns its id.
    pub fn add_option(&mut self) -> String {
        let option = QuestionOption::new("");
        let id = option.id.clone();
        self.options.push(option);
        id
    }

    pub fn remove_option(&mut self, option_id: &str) {
        self.options.retain(|o| o.id != option_id);
        self.correct_option_ids.retain(|id| id != option_id);
    }

    pub fn set_option_text(&mut self, option_id: &str, text: impl Into<String>) -> bool {
        match self.options.iter_mut().find(|o| o.id == option_id) {
            Some(option) => {
                option.text = text.into();
                true
            }
            None => false,
        }
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    /// True when the form holds nothing worth keeping.
    pub fn is_blank(&self) -> bool {
        self.editing.is_none()
            && self.question_text.trim().is_empty()
            && self.options.iter().all(|o| o.text.trim().is_empty())
    }

    /// Single choice: selecting replaces the previous answer, selecting it again clears it.
    /// Multiple choice: adds or removes the option.
    pub fn toggle_correct(&mut self, option_id: &str) {
        let selected = self.correct_option_ids.iter().any(|id| id == option_id);
        match (self.question_type, selected) {
            (QuestionType::Single, true) => self.correct_option_ids.clear(),
            (QuestionType::Single, false) => self.correct_option_ids = vec![option_id.to_string()],
            (QuestionType::Multiple, true) => self.correct_option_ids.retain(|id| id != option_id),
            (QuestionType::Multiple, false) => self.correct_option_ids.push(option_id.to_string()),
        }
    }

    /// Checks every question invariant and returns the cleaned values.
    /// Blank options are dropped and texts trimmed; correct ids follow option order.
    fn validated(&self) -> Result<(String, Vec<QuestionOption>, Vec<String>), AppError> {
        let text = self.question_text.trim();
        if text.is_empty() {
            return Err(AppError::validation("Question text is required"));
        }

        let mut seen = HashSet::new();
        if !self.options.iter().all(|o| seen.insert(o.id.as_str())) {
            return Err(AppError::validation("Option ids must be unique"));
        }

        let filled: Vec<QuestionOption> = self
            .options
            .iter()
            .filter(|o| !o.text.trim().is_empty())
            .map(|o| QuestionOption {
                id: o.id.clone(),
                text: o.text.trim().to_string(),
            })
            .collect();
        if filled.len() < 2 {
            return Err(AppError::validation("Provide at least two options"));
        }

        if self.correct_option_ids.is_empty() {
            return Err(AppError::validation("Select at least one correct answer"));
        }

        let selected: HashSet<&str> = self.correct_option_ids.iter().map(String::as_str).collect();
        let surviving: HashSet<&str> = filled.iter().map(|o| o.id.as_str()).collect();
        if !selected.is_subset(&surviving) {
            return Err(AppError::validation(
                "Correct answers must refer to options with text",
            ));
        }

        if self.question_type == QuestionType::Single && selected.len() != 1 {
            return Err(AppError::validation(
                "Single choice questions need exactly one correct answer",
            ));
        }

        let correct = filled
            .iter()
            .filter(|o| selected.contains(o.id.as_str()))
            .map(|o| o.id.clone())
            .collect();

        Ok((text.to_string(), filled, correct))
    }
}

/// Unsaved working list of questions for one quiz, plus the draft being edited.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingBuffer {
    questions: Vec<StagedQuestion>,
    draft: DraftQuestion,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the buffer from the persisted question set (edit flow).
    /// Local ids are fresh; positions follow `order_index`.
    pub fn from_persisted(mut records: Vec<QuestionRecord>) -> Self {
        records.sort_by_key(|r| r.order_index);
        let questions = records
            .into_iter()
            .enumerate()
            .map(|(pos, r)| StagedQuestion {
                id: uuid::Uuid::new_v4().to_string(),
                question_text: r.question_text,
                question_type: r.question_type,
                options: r.options,
                correct_option_ids: r.correct_answers,
                order_index: pos as i32 + 1,
            })
            .collect();

        Self {
            questions,
            draft: DraftQuestion::default(),
        }
    }

    pub fn questions(&self) -> &[StagedQuestion] {
        &self.questions
    }

    pub fn draft(&self) -> &DraftQuestion {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DraftQuestion {
        &mut self.draft
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Overwrites the draft form. The staged sequence is not touched.
    pub fn stage_draft_fields(
        &mut self,
        question_text: impl Into<String>,
        question_type: QuestionType,
        options: Vec<QuestionOption>,
        mut correct_option_ids: Vec<String>,
    ) {
        if question_type == QuestionType::Single && correct_option_ids.len() > 1 {
            correct_option_ids = correct_option_ids.split_off(correct_option_ids.len() - 1);
        }

        self.draft.question_text = question_text.into();
        self.draft.question_type = question_type;
        self.draft.options = options;
        self.draft.correct_option_ids = correct_option_ids;
    }

    /// Validates the draft and moves it into the sequence.
    ///
    /// An edited question is replaced in place and keeps its order index; a new one is appended.
    /// On failure neither the draft nor the sequence changes.
    pub fn commit_draft(&mut self) -> Result<&StagedQuestion, AppError> {
        let (question_text, options, correct_option_ids) = self.draft.validated()?;

        let target = self
            .draft
            .editing
            .as_deref()
            .and_then(|id| self.questions.iter().position(|q| q.id == id));

        let pos = match target {
            Some(pos) => {
                let existing = &mut self.questions[pos];
                existing.question_text = question_text;
                existing.question_type = self.draft.question_type;
                existing.options = options;
                existing.correct_option_ids = correct_option_ids;
                pos
            }
            None => {
                self.questions.push(StagedQuestion {
                    id: uuid::Uuid::new_v4().to_string(),
                    question_text,
                    question_type: self.draft.question_type,
                    options,
                    correct_option_ids,
                    order_index: self.questions.len() as i32 + 1,
                });
                self.questions.len() - 1
            }
        };

        self.draft = DraftQuestion::default();
        Ok(&self.questions[pos])
    }

    /// Removes a staged question. Remaining order indices are left as they are.
    pub fn discard(&mut self, question_id: &str) -> Result<StagedQuestion, AppError> {
        let pos = self.position(question_id)?;
        if self.draft.editing.as_deref() == Some(question_id) {
            self.draft.editing = None;
        }
        Ok(self.questions.remove(pos))
    }

    /// Copies a staged question into the draft. The question stays in the sequence
    /// until a commit replaces it.
    pub fn load_for_edit(&mut self, question_id: &str) -> Result<(), AppError> {
        let pos = self.position(question_id)?;
        let q = &self.questions[pos];
        self.draft = DraftQuestion {
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            correct_option_ids: q.correct_option_ids.clone(),
            editing: Some(q.id.clone()),
        };
        Ok(())
    }

    /// Abandons the draft. A question loaded for edit is still staged unchanged.
    pub fn cancel_edit(&mut self) {
        self.draft = DraftQuestion::default();
    }

    /// Rows for persistence, numbered 1..N by position.
    pub fn renumbered(&self, quiz_id: i64) -> Vec<NewQuestion> {
        renumber(&self.questions, quiz_id)
    }

    /// Drops the entries that were persisted by a publish.
    ///
    /// Only entries identical to the published snapshot go; questions committed or
    /// edited while the publish was running stay staged, as does the draft.
    pub fn remove_published(&mut self, published: &[StagedQuestion]) {
        self.questions.retain(|q| !published.contains(q));
        let target_gone = self
            .draft
            .editing
            .as_deref()
            .is_some_and(|id| !self.questions.iter().any(|q| q.id == id));
        if target_gone {
            self.draft.editing = None;
        }
    }

    /// Nothing staged and nothing typed into the draft.
    pub fn is_idle(&self) -> bool {
        self.questions.is_empty() && self.draft.is_blank()
    }

    pub fn clear(&mut self) {
        self.questions.clear();
        self.draft = DraftQuestion::default();
    }

    fn position(&self, question_id: &str) -> Result<usize, AppError> {
        self.questions
            .iter()
            .position(|q| q.id == question_id)
            .ok_or_else(|| AppError::validation("Question is not in the staging list"))
    }
}

/// Assigns order indices 1..N from sequence position, ignoring stored indices.
pub fn renumber(sequence: &[StagedQuestion], quiz_id: i64) -> Vec<NewQuestion> {
    sequence
        .iter()
        .enumerate()
        .map(|(pos, q)| q.to_new_question(quiz_id, pos as i32 + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: &str, text: &str) -> QuestionOption {
        QuestionOption {
            id: id.to_string(),
            text: text.to_string(),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn stage(buf: &mut StagingBuffer, text: &str, ty: QuestionType, opts: &[(&str, &str)], correct: &[&str]) {
        buf.stage_draft_fields(
            text,
            ty,
            opts.iter().map(|(id, t)| opt(id, t)).collect(),
            ids(correct),
        );
    }

    fn assert_subset(buf: &StagingBuffer) {
        for q in buf.questions() {
            for id in &q.correct_option_ids {
                assert!(q.options.iter().any(|o| &o.id == id));
            }
        }
    }

    #[test]
    fn commit_appends_with_next_order_index() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "2 + 2?", QuestionType::Single, &[("a", "3"), ("b", "4"), ("c", "5")], &["b"]);
        buf.commit_draft().unwrap();
        stage(&mut buf, "Primes?", QuestionType::Multiple, &[("x", "2"), ("y", "3")], &["x", "y"]);
        let q = buf.commit_draft().unwrap().clone();

        assert_eq!(q.order_index, 2);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.questions()[0].correct_option_ids, ids(&["b"]));
        assert_eq!(buf.draft(), &DraftQuestion { options: buf.draft().options.clone(), ..Default::default() });
        assert_subset(&buf);
    }

    #[test]
    fn empty_text_is_rejected_and_nothing_changes() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        let draft_before = buf.draft().clone();

        let err = buf.commit_draft().unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(buf.draft(), &draft_before);
        assert!(buf.is_empty());
    }

    #[test]
    fn fewer_than_two_filled_options_is_rejected_for_both_types() {
        for ty in [QuestionType::Single, QuestionType::Multiple] {
            let mut buf = StagingBuffer::new();
            stage(&mut buf, "Q", ty, &[("a", "A"), ("b", "   ")], &["a"]);
            assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn correct_answer_on_blank_option_is_rejected() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Multiple, &[("a", "A"), ("b", "B"), ("c", " ")], &["a", "c"]);
        assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn unknown_correct_id_is_rejected() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Single, &[("a", "A"), ("b", "B")], &["zzz"]);
        assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn missing_correct_answer_is_rejected() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Multiple, &[("a", "A"), ("b", "B")], &[]);
        assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn single_choice_never_stages_more_than_one_answer() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a", "b"]);
        assert_eq!(buf.draft().correct_option_ids, ids(&["b"]));

        let q = buf.commit_draft().unwrap();
        assert_eq!(q.correct_option_ids, ids(&["b"]));

        // Direct edits of the draft still cannot sneak two answers through.
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Multiple, &[("a", "A"), ("b", "B")], &["a", "b"]);
        buf.draft_mut().question_type = QuestionType::Single;
        assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn blank_options_are_dropped_and_text_trimmed() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "  Capital?  ", QuestionType::Single, &[("a", " Paris "), ("b", ""), ("c", "Rome")], &["a"]);
        let q = buf.commit_draft().unwrap();
        assert_eq!(q.question_text, "Capital?");
        assert_eq!(q.options, vec![opt("a", "Paris"), opt("c", "Rome")]);
    }

    #[test]
    fn correct_ids_follow_option_order_without_duplicates() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Multiple, &[("x", "X"), ("y", "Y")], &["y", "x", "y"]);
        assert_eq!(buf.commit_draft().unwrap().correct_option_ids, ids(&["x", "y"]));
    }

    #[test]
    fn duplicate_option_ids_are_rejected() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "Q", QuestionType::Single, &[("a", "A"), ("a", "B")], &["a"]);
        assert!(matches!(buf.commit_draft(), Err(AppError::Validation(_))));
    }

    #[test]
    fn discard_leaves_gaps_and_renumber_closes_them() {
        let mut buf = StagingBuffer::new();
        for text in ["one", "two", "three"] {
            stage(&mut buf, text, QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
            buf.commit_draft().unwrap();
        }
        let first = buf.questions()[0].id.clone();
        buf.discard(&first).unwrap();

        let stored: Vec<i32> = buf.questions().iter().map(|q| q.order_index).collect();
        assert_eq!(stored, vec![2, 3]);

        let rows = buf.renumbered(7);
        assert_eq!(rows.iter().map(|r| r.order_index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(rows[0].question_text, "two");
        assert!(rows.iter().all(|r| r.quiz_id == 7));
    }

    #[test]
    fn discard_unknown_id_fails() {
        let mut buf = StagingBuffer::new();
        assert!(buf.discard("nope").is_err());
    }

    #[test]
    fn edit_keeps_question_until_commit_and_replaces_in_place() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "first", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        buf.commit_draft().unwrap();
        stage(&mut buf, "second", QuestionType::Single, &[("a", "A"), ("b", "B")], &["b"]);
        buf.commit_draft().unwrap();
        let target = buf.questions()[0].clone();

        buf.load_for_edit(&target.id).unwrap();
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.draft().question_text, "first");
        assert_eq!(buf.draft().editing.as_deref(), Some(target.id.as_str()));

        buf.draft_mut().question_text = "first, revised".into();
        buf.commit_draft().unwrap();

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.questions()[0].id, target.id);
        assert_eq!(buf.questions()[0].order_index, target.order_index);
        assert_eq!(buf.questions()[0].question_text, "first, revised");
    }

    #[test]
    fn cancel_edit_keeps_staged_question() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "keep me", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        buf.commit_draft().unwrap();
        let before = buf.questions().to_vec();

        buf.load_for_edit(&before[0].id).unwrap();
        buf.draft_mut().question_text = "changed".into();
        buf.cancel_edit();

        assert_eq!(buf.questions(), before.as_slice());
        assert_eq!(buf.draft().editing, None);
    }

    #[test]
    fn failed_edit_commit_keeps_question_and_draft() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "keep me", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        buf.commit_draft().unwrap();
        let before = buf.questions().to_vec();

        buf.load_for_edit(&before[0].id).unwrap();
        buf.draft_mut().question_text = " ".into();
        assert!(buf.commit_draft().is_err());

        assert_eq!(buf.questions(), before.as_slice());
        assert_eq!(buf.draft().editing.as_deref(), Some(before[0].id.as_str()));
    }

    #[test]
    fn discarding_edit_target_turns_draft_into_new_question() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "gone", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        buf.commit_draft().unwrap();
        let id = buf.questions()[0].id.clone();

        buf.load_for_edit(&id).unwrap();
        buf.discard(&id).unwrap();
        assert_eq!(buf.draft().editing, None);

        let q = buf.commit_draft().unwrap();
        assert_ne!(q.id, id);
        assert_eq!(q.order_index, 1);
    }

    #[test]
    fn toggle_correct_respects_question_type() {
        let mut draft = DraftQuestion::default();
        let a = draft.options[0].id.clone();
        let b = draft.options[1].id.clone();

        draft.toggle_correct(&a);
        draft.toggle_correct(&b);
        assert_eq!(draft.correct_option_ids, vec![b.clone()]);
        draft.toggle_correct(&b);
        assert!(draft.correct_option_ids.is_empty());

        draft.set_question_type(QuestionType::Multiple);
        draft.toggle_correct(&a);
        draft.toggle_correct(&b);
        assert_eq!(draft.correct_option_ids, vec![a.clone(), b.clone()]);

        draft.set_question_type(QuestionType::Single);
        assert_eq!(draft.correct_option_ids, vec![a]);
    }

    #[test]
    fn removing_option_unselects_it() {
        let mut draft = DraftQuestion::default();
        let extra = draft.add_option();
        assert!(draft.set_option_text(&extra, "C"));
        draft.set_question_type(QuestionType::Multiple);
        draft.toggle_correct(&extra);

        draft.remove_option(&extra);
        assert_eq!(draft.options.len(), 2);
        assert!(draft.correct_option_ids.is_empty());
        assert!(!draft.set_option_text(&extra, "again"));
    }

    #[test]
    fn remove_published_keeps_later_work() {
        let mut buf = StagingBuffer::new();
        stage(&mut buf, "First", QuestionType::Single, &[("a", "A"), ("b", "B")], &["a"]);
        buf.commit_draft().unwrap();
        stage(&mut buf, "Second", QuestionType::Single, &[("a", "A"), ("b", "B")], &["b"]);
        buf.commit_draft().unwrap();
        let snapshot = buf.questions()[..1].to_vec();

        // Edited after the snapshot was taken, so its new content was never published
        let second = buf.questions()[1].id.clone();
        let first = buf.questions()[0].id.clone();
        buf.load_for_edit(&first).unwrap();
        buf.remove_published(&snapshot);

        assert_eq!(buf.len(), 1);
        assert_eq!(buf.questions()[0].id, second);
        assert_eq!(buf.draft().question_text, "First");
        assert_eq!(buf.draft().editing, None);
        assert!(!buf.is_idle());
    }

    #[test]
    fn blank_draft_is_idle() {
        let mut buf = StagingBuffer::new();
        assert!(buf.is_idle());

        buf.draft_mut().question_text = "Half typed".into();
        assert!(!buf.is_idle());
        buf.cancel_edit();
        assert!(buf.is_idle());
    }

    #[test]
    fn from_persisted_orders_by_index() {
        let record = |id: i64, idx: i32, text: &str| QuestionRecord {
            id,
            quiz_id: 1,
            question_text: text.into(),
            question_type: QuestionType::Single,
            options: vec![opt("a", "A"), opt("b", "B")],
            correct_answers: ids(&["a"]),
            order_index: idx,
        };
        let buf = StagingBuffer::from_persisted(vec![record(10, 2, "second"), record(11, 1, "first")]);

        let texts: Vec<&str> = buf.questions().iter().map(|q| q.question_text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(buf.questions()[1].order_index, 2);
    }
}
