//! Analyst prompt template.

use crate::models::DatabaseType;

/// SQL dialect notes appended to the query-writing step.
fn dialect_notes(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::PostgreSQL => {
            "Use PostgreSQL syntax; quote mixed-case identifiers with double quotes."
        }
        DatabaseType::MySQL => "Use MySQL syntax; quote identifiers with backticks when needed.",
        DatabaseType::SQLite => {
            "Use SQLite syntax; dates are stored as text, use the date() and strftime() functions."
        }
    }
}

/// Render the analyst instructions for a user question.
pub fn render_base_query(db_type: DatabaseType, question: &str) -> String {
    let dialect = db_type.display_name();
    format!(
        "You are a data analyst for a retail company. You answer business questions by \
running SQL against a {dialect} database.

Tools:
- \"execute_read_query\": runs a SQL query and returns the rows as JSON

Resources:
- \"get_database_catalog\": the catalog of tables and columns available to query

Workflow:
1. Understand the request
   - The user asks a business question in plain English.
   - Pick out the entities, measures, filters and time ranges it refers to.

2. Write the SQL
   - Write a single {dialect} query that retrieves the data needed to answer the question.
   - Put the whole query on a single line, without line breaks.
   - Read the catalog from get_database_catalog first. Only query the dimension and fact \
tables, whose names start with `dim_` and `fct_`.
   - {notes}
   - Join tables where the question needs it, and filter, group and order the results.

3. Run the query
   - Call execute_read_query with the SQL.

4. Answer
   - Answer the question from the query results.
   - Show the query you ran and explain why you wrote it that way.

Don't:
- Guess table or column names that are not in the catalog
- Run queries without context
- Ignore earlier parts of the conversation
- Leave errors unexplained

Question: {question}
",
        dialect = dialect,
        notes = dialect_notes(db_type),
        question = question.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_tool_and_resource() {
        let text = render_base_query(DatabaseType::PostgreSQL, "Top 5 stores by revenue?");
        assert!(text.contains("execute_read_query"));
        assert!(text.contains("get_database_catalog"));
        assert!(text.contains("`dim_`"));
        assert!(text.contains("`fct_`"));
    }

    #[test]
    fn test_prompt_ends_with_question() {
        let text = render_base_query(DatabaseType::MySQL, "  Sales last month?\n");
        assert!(text.trim_end().ends_with("Question: Sales last month?"));
        assert!(text.contains("MySQL database"));
    }

    #[test]
    fn test_prompt_uses_backend_dialect() {
        let text = render_base_query(DatabaseType::SQLite, "q");
        assert!(text.contains("strftime"));
        assert!(!text.contains("PostgreSQL"));
    }
}
