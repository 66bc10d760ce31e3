use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::blocking::Client;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(
    name = "coursefind-cli",
    about = "Query a running coursed server from the terminal"
)]
struct CourseCli {
    /// Course code or topic to search for
    query: String,

    /// Search endpoint of the coursed server
    #[arg(
        long,
        env = "COURSEFIND_URL",
        default_value = "http://127.0.0.1:8080/search"
    )]
    url: String,

    /// Seconds before the request times out
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Print full descriptions instead of the one-line listing
    #[arg(long, default_value_t = false)]
    full: bool,
}

fn main() -> Result<()> {
    let cli = CourseCli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs.max(1)))
        .build()
        .context("failed to build HTTP client")?;
    let resp = client
        .get(&cli.url)
        .query(&[("query", cli.query.as_str())])
        .send()
        .with_context(|| format!("failed to call {}", cli.url))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        bail!("server returned {}: {}", status, body);
    }
    let parsed: SearchResponse = resp.json().context("failed to parse search response")?;
    if parsed.courses.is_empty() {
        println!("No courses matched \"{}\".", cli.query);
        return Ok(());
    }
    for course in &parsed.courses {
        render_course(course, cli.full);
    }
    println!("{} course(s) matched.", parsed.courses.len());
    Ok(())
}

fn render_course(course: &CourseListing, full: bool) {
    println!(
        "{}  {}  [{:.2}]",
        course.course_code, course.title, course.similarity
    );
    if !course.instructor.is_empty() {
        println!("    instructor: {}", course.instructor);
    }
    if !course.schedule.is_empty() {
        let location = if course.location.is_empty() {
            String::new()
        } else {
            format!(" @ {}", course.location)
        };
        println!("    meets: {}{}", course.schedule, location);
    }
    if full && !course.description.is_empty() {
        println!("    {}", course.description);
    }
    println!();
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    courses: Vec<CourseListing>,
}

#[derive(Debug, Deserialize)]
struct CourseListing {
    #[allow(dead_code)]
    id: String,
    course_code: String,
    title: String,
    description: String,
    similarity: f64,
    location: String,
    instructor: String,
    schedule: String,
}
