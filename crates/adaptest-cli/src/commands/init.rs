//! The `adaptest init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create adaptest.toml
    if std::path::Path::new("adaptest.toml").exists() {
        println!("adaptest.toml already exists, skipping.");
    } else {
        std::fs::write("adaptest.toml", SAMPLE_CONFIG)?;
        println!("Created adaptest.toml");
    }

    // Create example exam and response script
    std::fs::create_dir_all("exams/scripts")?;
    for (path, content) in [
        ("exams/example.toml", EXAMPLE_EXAM),
        ("exams/scripts/example-responses.toml", EXAMPLE_RESPONSES),
    ] {
        if std::path::Path::new(path).exists() {
            println!("{path} already exists, skipping.");
        } else {
            std::fs::write(path, content)?;
            println!("Created {path}");
        }
    }

    println!("\nNext steps:");
    println!("  1. Edit adaptest.toml with your grading endpoint");
    println!("  2. Run: adaptest validate --exam exams/example.toml");
    println!(
        "  3. Run: adaptest simulate --exam exams/example.toml --responses exams/scripts/example-responses.toml"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# adaptest configuration

default_difficulty = 3.0
tick_interval_ms = 1000
output_dir = "./adaptest-results"

[grading]
# base_url = "https://grading.example.com"
api_key = "${ADAPTEST_API_KEY}"
timeout_secs = 30
"#;

const EXAMPLE_EXAM: &str = r#"[exam]
id = "example"
title = "Example Exam"
duration_minutes = 10
passing_score_percent = 60

[[questions]]
id = "two-plus-two"
kind = "single_choice"
difficulty = 1.0
prompt = "What is 2 + 2?"
options = ["3", "4", "5"]
correct_answer = "4"
hints = ["Count on your fingers."]
explanation = "2 + 2 = 4."

[questions.metadata]
topic = "arithmetic"

[[questions]]
id = "earth-round"
kind = "true_false"
difficulty = 1.5
prompt = "The Earth is roughly spherical."
correct_answer = "True"
explanation = "The Earth is an oblate spheroid."

[questions.metadata]
topic = "science"

[[questions]]
id = "water-formula"
kind = "free_text"
difficulty = 2.0
prompt = "What is the chemical formula for water?"
correct_answer = "H2O"
hints = ["Two hydrogen atoms, one oxygen atom."]
explanation = "Water is H2O."

[questions.metadata]
topic = "science"
"#;

const EXAMPLE_RESPONSES: &str = r#"[[responses]]
answer = { kind = "choice", index = 1 }
confidence = 5
time_spent_secs = 20

[[responses]]
answer = { kind = "true_false", value = true }
confidence = 4
time_spent_secs = 15

[[responses]]
help = true
answer = { kind = "free_text", text = "H2O" }
confidence = 3
time_spent_secs = 90
"#;
