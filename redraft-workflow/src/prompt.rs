//! Prompt builders for both task variants
//!
//! Every prompt names the exact delimiter pair the extraction gate will
//! look for and spells out the forbidden behaviors (no invented data, no
//! rebinding the data handle, no prose outside the delimiters). Builders
//! are pure string assembly; nothing here talks to a model.

use redraft_core::{TagPair, DATA_HANDLE};

/// Prompt for drafting plotting code (v1).
pub fn chart_generation(gate: &TagPair, instruction: &str, schema: &str, out_path: &str) -> String {
    format!(
        r#"You are a data visualization expert.

Return your answer *strictly* in this format:

{}
# valid Python code here
{}

Do not add any explanation; reply with the tags and the code only.

The DataFrame '{}' already exists and holds the real data. Columns:
{}
User instruction: {}

Code requirements:
1. Work with the existing '{}' variable directly; it is already loaded.
2. Never invent sample data; do not build a new DataFrame with pd.DataFrame().
3. Never rebind the data handle; no `{} = ...` assignments.
4. Plot with matplotlib.
5. Add a clear title and axis labels, and a legend where it helps.
6. Save the figure to '{}' with dpi=300.
7. Do not call plt.show().
8. Close every figure with plt.close().
9. Include every import the code needs (pandas, matplotlib, ...).

Return only the code wrapped in {} tags."#,
        gate.open(),
        gate.close(),
        DATA_HANDLE,
        schema,
        instruction,
        DATA_HANDLE,
        DATA_HANDLE,
        out_path,
        gate.open(),
    )
}

/// Prompt for reviewing a rendered chart (the image rides along as a
/// multimodal part) and proposing refined code (v2).
pub fn chart_reflection(
    gate: &TagPair,
    instruction: &str,
    schema: &str,
    code_v1: &str,
    out_path: &str,
) -> String {
    chart_refine(
        gate,
        "review the attached chart against the instruction and the original code",
        instruction,
        schema,
        code_v1,
        out_path,
    )
}

/// Prompt for reviewing plotting code from its text alone.
pub fn chart_review(
    gate: &TagPair,
    instruction: &str,
    schema: &str,
    code_v1: &str,
    out_path: &str,
) -> String {
    chart_refine(
        gate,
        "review the plotting code below against the instruction, without running it",
        instruction,
        schema,
        code_v1,
        out_path,
    )
}

fn chart_refine(
    gate: &TagPair,
    mission: &str,
    instruction: &str,
    schema: &str,
    code_v1: &str,
    out_path: &str,
) -> String {
    format!(
        r#"You are a data visualization expert.
Your task: {}, then return improved matplotlib code.

Original code (context):
{}

Output format (follow it exactly):
1) First line: a valid JSON object with a single "feedback" field.
   Example: {{"feedback": "The legend is unclear and the axis labels overlap."}}
2) After a newline, only the improved Python code wrapped in:
{}
...
{}
3) Import everything the code needs; do not rely on imports from the
   original code.

Hard constraints:
- Nothing outside the two parts above: no markdown, no backticks, no prose.
- pandas and matplotlib only (no seaborn).
- The DataFrame '{}' already exists and holds the real data; use it as-is.
- Never invent sample data; do not build a new DataFrame with pd.DataFrame().
- Never rebind the data handle; no `{} = ...` assignments.
- Do not read data from files; '{}' is already loaded.
- Save the figure to '{}' with dpi=300.
- Always finish with plt.close(); never call plt.show().

Columns available in '{}':
{}
Instruction:
{}"#,
        mission,
        code_v1,
        gate.open(),
        gate.close(),
        DATA_HANDLE,
        DATA_HANDLE,
        DATA_HANDLE,
        out_path,
        DATA_HANDLE,
        schema,
        instruction,
    )
}

/// Prompt for drafting a SQL query (v1).
pub fn sql_generation(gate: &TagPair, question: &str, schema: &str) -> String {
    format!(
        r#"You are a SQL assistant. Given the database schema and the user
question, write one SQL query for SQLite.

Schema:
{}

User question:
{}

Return your answer *strictly* in this format:

{}
SELECT ...
{}

Requirements:
1. Exactly one statement inside the tags and nothing outside them.
2. No markdown fences (no ```sql or ```).
3. The statement must run against SQLite as written."#,
        schema,
        question,
        gate.open(),
        gate.close(),
    )
}

/// Prompt for reviewing a query against what it actually returned.
pub fn sql_reflection(question: &str, sql_v1: &str, rendered_result: &str, schema: &str) -> String {
    sql_refine(question, sql_v1, Some(rendered_result), schema)
}

/// Prompt for reviewing a query from its text alone.
pub fn sql_review(question: &str, sql_v1: &str, schema: &str) -> String {
    sql_refine(question, sql_v1, None, schema)
}

fn sql_refine(question: &str, sql_v1: &str, rendered_result: Option<&str>, schema: &str) -> String {
    let output_block = match rendered_result {
        Some(rendered) => format!("\nSQL output:\n{}\n", rendered.trim_end()),
        None => String::new(),
    };
    let assessment = match rendered_result {
        Some(_) => "briefly assess whether this output answers the user question",
        None => "briefly assess whether the SQL answers the user question",
    };
    format!(
        r#"You are a SQL review and optimization expert.

User question:
{}

Original SQL:
{}
{}
Table schema:
{}

Step 1: {}.
Step 2: if it can be improved, provide an optimized SQLite query.
If the original SQL is already correct, return it unchanged.

Requirements:
1. Return a single JSON object and nothing else.
2. No markdown fences (no ```json or ```).
3. The object holds exactly these two fields:
- "feedback": a short assessment and suggestion
- "refined_sql": the final SQL to run"#,
        question,
        sql_v1,
        output_block,
        schema,
        assessment,
    )
}
