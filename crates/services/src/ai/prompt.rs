use quiz_core::model::{AiQuestion, AiQuestionKind, AiQuestionType, StudentAnswer};
use serde_json::{Value, json};

/// Schema of one generated question, in the API's OpenAPI subset.
pub(crate) fn question_schema() -> Value {
    let types: Vec<&str> = AiQuestionType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "question_text": { "type": "STRING" },
            "question_type": { "type": "STRING", "enum": types },
            "correct_answer_reference": { "type": "STRING" },
            "answers": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "answerText": { "type": "STRING" },
                        "isCorrect": { "type": "BOOLEAN" }
                    },
                    "required": ["answerText", "isCorrect"]
                }
            },
            "language": { "type": "STRING" },
            "initial_code": { "type": "STRING" }
        },
        "required": ["question_text", "question_type", "correct_answer_reference"]
    })
}

pub(crate) fn question_list_schema() -> Value {
    json!({ "type": "ARRAY", "items": question_schema() })
}

pub(crate) fn evaluation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "evaluation": { "type": "STRING" },
            "isCorrect": { "type": "BOOLEAN" }
        },
        "required": ["evaluation", "isCorrect"]
    })
}

pub(crate) fn generation_prompt(topic: &str, count: usize) -> String {
    format!(
        r#"Generate {count} varied questions (multiple choice, fill in the blank and code evaluation) about "{topic}".
For each question provide:
- "question_text": the question itself.
- "question_type": "MULTIPLE_CHOICE", "FILL_IN_BLANK" or "CODE_EVAL".
- "correct_answer_reference": for multiple choice, a JSON string holding an array of {{ "answerText": "...", "isCorrect": true }} objects for the correct options only. For fill in the blank, the exact answer. For code, the evaluation criteria or the expected output.
- For "MULTIPLE_CHOICE", an "answers" array with "answerText" and "isCorrect" for ALL options.
- For "CODE_EVAL", optionally "language" (e.g. "Python", "C") and "initial_code" for the student to start from.

Return an ARRAY of JSON objects, each following this schema: {schema}
Keep the questions within operating systems."#,
        schema = question_schema()
    )
}

pub(crate) fn evaluation_prompt(question: &AiQuestion, answer: &StudentAnswer) -> String {
    match &question.kind {
        AiQuestionKind::MultipleChoice { .. } => format!(
            r#"The multiple-choice question is: "{text}".
The correct options are: {correct}.
The student selected: {selected}.
Decide whether the answer is *fully* correct (every correct option selected and no incorrect one) and give clear, concise feedback. Reply ONLY with the JSON holding the boolean "isCorrect" and the string "evaluation"."#,
            text = question.text,
            correct = json!(question.correct_choice_texts()),
            selected = json!(answer.as_choices()),
        ),
        AiQuestionKind::FillInBlank { expected } => format!(
            r#"The fill-in-the-blank question is: "{text}".
The expected answer is: "{expected}".
The student answered: "{given}".
Decide whether the answer is correct against the expected one and give feedback. Accept minor variations (letter case, extra spaces) when they are logically correct. Reply ONLY with the JSON holding the boolean "isCorrect" and the string "evaluation"."#,
            text = question.text,
            given = answer.as_text(),
        ),
        AiQuestionKind::CodeEval {
            criteria,
            language,
            initial_code,
        } => format!(
            r#"The code evaluation question is: "{text}".
The starting code (if any) is: "{initial}".
The evaluation criteria or expected output are: "{criteria}".
The student submitted:
```{lang}
{code}
```

Evaluate the student's code against the criteria or expected output.
Decide whether it is correct (true) or incorrect (false) and give detailed feedback covering:
1. Whether the solution meets the requirements.
2. Which parts are right or wrong.
3. Suggestions if it is wrong, or a confirmation if it is right.
Reply ONLY with the JSON holding "isCorrect" (boolean) and "evaluation" (string) with the feedback."#,
            text = question.text,
            initial = initial_code.as_deref().unwrap_or("N/A"),
            lang = language.as_deref().unwrap_or("text"),
            code = answer.as_text(),
        ),
    }
}
