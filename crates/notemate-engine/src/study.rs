//! Study-material generation on top of retrieval.
//!
//! A [`StudyTask`] names what to produce. [`StudySession`] retrieves grounding
//! context from the engine, hands it with the task prompt to a [`Generator`],
//! and wraps the response in a typed [`StudyMaterial`].

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use notemate_core::error::Result;

use crate::RetrievalEngine;

/// Text generation backend (an LLM client in practice).
///
/// `context` is exactly what the engine's `query` returned. Backend failures
/// should surface as [`Error::Generation`](notemate_core::Error::Generation).
pub trait Generator: Send + Sync {
    fn generate_with_context(&self, prompt: &str, context: &[String]) -> Result<String>;
}

/// Wrap `prompt` so the model answers from `context` only.
pub fn grounded_prompt(prompt: &str, context: &[String]) -> String {
    format!(
        "Use ONLY the following context extracted from notes:\n\n{}\n\n\
         Now perform this task:\n\n{}\n\n\
         Your answer must stay grounded in the context.\n",
        context.join("\n\n"),
        prompt.trim()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizKind {
    #[default]
    Mcq,
    Scenario,
    Short,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudyTask {
    Quiz { questions: usize, kind: QuizKind },
    Lesson { topic: String },
    StudyPlan { chapters: Vec<String>, days: u32, difficulty: String },
    ExplainLevels { concept: String },
    Story { concept: String },
    MindMap,
    Summary,
    Flashcards { cards: usize },
}

impl StudyTask {
    pub fn prompt(&self) -> String {
        match self {
            Self::Quiz { questions, kind } => quiz_prompt(*questions, *kind),
            Self::Lesson { topic } => format!(
                "Create a full lesson on '{topic}' with learning objectives, an introduction, \
                 core concepts, examples, real-world applications, a summary and an exercise."
            ),
            Self::StudyPlan { chapters, days, difficulty } => format!(
                "Create a {days}-day study plan.\nStudent level: {difficulty}\n\nChapters:\n{}\n\n\
                 Format each line as:\nDay X | Topics | Activities | Expected Outcomes",
                chapter_list(chapters)
            ),
            Self::ExplainLevels { concept } => format!(
                "Explain '{concept}' at three levels, \
                 as three paragraphs separated by a blank line:\n\
                 BEGINNER:\nINTERMEDIATE:\nADVANCED:"
            ),
            Self::Story { concept } => format!("Explain '{concept}' as a creative story."),
            Self::MindMap => "Generate a hierarchical mindmap of key concepts.".to_string(),
            Self::Summary => "Summarize all key ideas.".to_string(),
            Self::Flashcards { cards } => format!("Generate {cards} flashcards (front/back)."),
        }
    }

    /// Text to retrieve grounding chunks with. `None` when the task brings
    /// its own context.
    pub fn retrieval_query(&self) -> Option<String> {
        match self {
            Self::Quiz { .. } => Some("key concepts, definitions and facts".to_string()),
            Self::Lesson { topic } => Some(topic.clone()),
            Self::StudyPlan { .. } => None,
            Self::ExplainLevels { concept } | Self::Story { concept } => Some(concept.clone()),
            Self::MindMap => Some("main topics and how they relate".to_string()),
            Self::Summary => Some("key ideas".to_string()),
            Self::Flashcards { .. } => Some("definitions and key terms".to_string()),
        }
    }

    fn own_context(&self) -> Vec<String> {
        match self {
            Self::StudyPlan { chapters, .. } => vec![chapter_list(chapters)],
            _ => Vec::new(),
        }
    }

    fn into_material(self, content: String) -> StudyMaterial {
        match self {
            Self::Quiz { questions, kind } => StudyMaterial::Quiz(Quiz {
                kind,
                questions,
                content,
            }),
            Self::Lesson { topic } => StudyMaterial::Lesson { topic, content },
            Self::StudyPlan { days, .. } => StudyMaterial::StudyPlan { days, content },
            Self::ExplainLevels { concept } => {
                StudyMaterial::Explanation(LeveledExplanation::parse(concept, &content))
            }
            Self::Story { concept } => StudyMaterial::Story { concept, content },
            Self::MindMap => StudyMaterial::MindMap { content },
            Self::Summary => StudyMaterial::Summary { content },
            Self::Flashcards { cards } => StudyMaterial::Flashcards { cards, content },
        }
    }
}

fn chapter_list(chapters: &[String]) -> String {
    chapters.iter().map(|c| format!("- {c}")).collect::<Vec<_>>().join("\n")
}

fn quiz_prompt(questions: usize, kind: QuizKind) -> String {
    let body = match kind {
        QuizKind::Mcq => format!(
            "Create exactly {questions} multiple-choice questions.\n\
             Each question starts with \"Q<n>.\" and has four options labeled A), B), C), D).\n\
             Put the correct letter on its own line starting with \"Answer:\".\n\
             Leave one blank line between questions. No text before Q1, after the last answer, \
             or explanations after answers."
        ),
        QuizKind::Scenario => format!(
            "Create exactly {questions} scenario-based questions.\n\
             Format each as \"Q<n>. <scenario>\" followed by \"Answer: <short model answer>\".\n\
             No introduction and no commentary."
        ),
        QuizKind::Short => format!(
            "Create exactly {questions} conceptual short-answer questions.\n\
             Format each as \"Q<n>. <question>\" followed by \"Answer: <2-4 line answer>\".\n\
             No introduction and no commentary."
        ),
    };
    format!("You are an exam generator.\n\n{body}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub kind: QuizKind,
    pub questions: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveledExplanation {
    pub concept: String,
    pub beginner: String,
    pub intermediate: String,
    pub advanced: String,
}

impl LeveledExplanation {
    /// Split a response into levels on blank lines. A response without blank
    /// lines becomes the beginner level; anything past the third section is
    /// kept with the advanced level.
    pub fn parse(concept: String, response: &str) -> Self {
        let mut sections = response.split("\n\n");
        let beginner = sections.next().unwrap_or_default().to_string();
        let intermediate = sections.next().unwrap_or_default().to_string();
        let advanced = sections.collect::<Vec<_>>().join("\n\n");
        Self { concept, beginner, intermediate, advanced }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StudyMaterial {
    Quiz(Quiz),
    Lesson { topic: String, content: String },
    StudyPlan { days: u32, content: String },
    Explanation(LeveledExplanation),
    Story { concept: String, content: String },
    MindMap { content: String },
    Summary { content: String },
    Flashcards { cards: usize, content: String },
}

/// Borrows an engine and a generator for the duration of a study session.
pub struct StudySession<'a, G: Generator> {
    engine: &'a RetrievalEngine,
    generator: &'a G,
}

impl<'a, G: Generator> StudySession<'a, G> {
    pub fn new(engine: &'a RetrievalEngine, generator: &'a G) -> Self {
        Self { engine, generator }
    }

    /// Retrieve up to `k` chunks from `collection` for `task` and generate.
    pub fn generate(&self, collection: &str, task: StudyTask, k: usize) -> Result<StudyMaterial> {
        let context = match task.retrieval_query() {
            Some(query) => self.engine.query(collection, &query, k)?,
            None => task.own_context(),
        };
        if context.is_empty() {
            warn!(collection, "generating without retrieved context");
        }
        let response = self.generator.generate_with_context(&task.prompt(), &context)?;
        info!(
            collection,
            context = context.len(),
            chars = response.len(),
            "study material generated"
        );
        Ok(task.into_material(response))
    }
}
