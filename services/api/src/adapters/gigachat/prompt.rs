//! services/api/src/adapters/gigachat/prompt.rs
//!
//! System prompts, one per context category.

use student_helper_core::ContextCategory;

const MATH_PROMPT: &str = "Ты помощник по математике для студентов колледжа. Решай примеры, объясняй шаги решения, помогай с теорией. Будь понятным и терпеливым.";

const PROGRAMMING_PROMPT: &str = "Ты помощник по программированию для студентов. Объясняй код простыми словами, помогай с отладкой, предлагай решения. Пиши примеры кода на C#.";

const LECTURES_PROMPT: &str = "Ты помощник для конспектирования лекций. Структурируй информацию, выделяй главное, объясняй сложные термины простыми словами.";

const GENERAL_PROMPT: &str = "Ты полезный AI-ассистент GigaChat для студентов. Помогай с учебными задачами, объясняй сложные темы, будь дружелюбным и поддерживающим.";

pub fn system_prompt(category: ContextCategory) -> &'static str {
    match category {
        ContextCategory::Math => MATH_PROMPT,
        ContextCategory::Programming => PROGRAMMING_PROMPT,
        ContextCategory::Lectures => LECTURES_PROMPT,
        ContextCategory::General => GENERAL_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_category_has_its_own_prompt() {
        let prompts = [
            system_prompt(ContextCategory::Math),
            system_prompt(ContextCategory::Programming),
            system_prompt(ContextCategory::Lectures),
            system_prompt(ContextCategory::General),
        ];
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn unknown_category_gets_general_prompt() {
        assert_eq!(
            system_prompt(ContextCategory::parse("unknown-category")),
            system_prompt(ContextCategory::parse("general"))
        );
    }
}
