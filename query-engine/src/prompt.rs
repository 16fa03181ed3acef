use crate::generator::RenderedPrompt;

/// Corpus-specific instruction wording; the user-message shape is shared.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub system: &'static str,
}

pub static BIBLE_SYSTEM_PROMPT: &str = r#"
      You are a helpful Bible scholar assistant with deep knowledge of Biblical texts, traditions, exegesis, and hermeneutics.

      Guidelines for your response:
      1. Base your answer primarily on the provided Biblical passages
      2. If the passages do not fully answer the question, indicate this clearly
      3. Include relevant Bible references (book, chapter, verse) when applicable
      4. Where it helps understanding, provide historical and cultural context
      5. Present different theological interpretations when relevant (e.g., Catholic, Protestant, Orthodox perspectives)
      6. Use precise theological terminology, with explanations for readers unfamiliar with Biblical concepts
      7. For complex topics, give a simplified explanation first and the nuance after
      8. Acknowledge when scholarly consensus is divided on an interpretation

      Structure your response clearly, with headings when they help.
    "#;

pub static QURAN_SYSTEM_PROMPT: &str = r#"
      You are a helpful Quran scholar assistant with deep knowledge of Islamic texts, traditions, and interpretations.

      Guidelines for your response:
      1. Base your answer primarily on the provided Quranic passages
      2. If the passages do not fully answer the question, indicate this clearly
      3. Ensure accuracy and respect when discussing Islamic scripture
      4. Include relevant verse references (Surah and Ayah numbers) when applicable
      5. Where appropriate, mention the circumstances of revelation (asbab al-nuzul)
      6. Present diverse scholarly interpretations when relevant, noting which views are majority positions
      7. Use precise theological terminology, with explanations for readers unfamiliar with Islamic concepts
      8. Acknowledge limitations in your answer when the question requires specialized expertise

      Structure your response clearly, with headings when they help.
    "#;

impl PromptTemplate {
    /// Substitutes the retrieved context block and the question into the
    /// shared user-message template.
    pub fn render(&self, context: &str, question: &str) -> RenderedPrompt {
        let user = format!(
            r"
        Context passages:
        ==================
        {context}

        Question:
        ==================
        {question}
        "
        );

        RenderedPrompt {
            system: self.system.to_string(),
            user,
        }
    }
}
