#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub context: String,
    pub question: String,
}

impl Prompt {
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            question: question.into(),
        }
    }

    /// Context and question are inserted verbatim; braces in either are
    /// plain text.
    pub fn render(&self) -> String {
        format!(
            "Answer the question based ONLY on the following context:\n\n{}\n\nQuestion: {}\n",
            self.context, self.question
        )
    }
}
