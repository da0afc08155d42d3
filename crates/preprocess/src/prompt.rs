use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Saturday and Sunday of the weekend `today` belongs to, or the coming one
/// on weekdays.
pub fn this_weekend(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let saturday = match today.weekday() {
        Weekday::Sun => today - Duration::days(1),
        weekday => {
            let ahead = 5 - weekday.num_days_from_monday() as i64;
            today + Duration::days(ahead)
        }
    };
    (saturday, saturday + Duration::days(1))
}

pub fn next_weekend(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (saturday, sunday) = this_weekend(today);
    (saturday + Duration::weeks(1), sunday + Duration::weeks(1))
}

fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn weekend_span((saturday, sunday): (NaiveDate, NaiveDate)) -> String {
    if saturday.month() == sunday.month() {
        format!(
            "{} {}-{}, {}",
            saturday.format("%B"),
            saturday.day(),
            sunday.day(),
            sunday.year()
        )
    } else {
        format!("{} - {}", long_date(saturday), long_date(sunday))
    }
}

pub fn build_system_prompt(today: NaiveDate) -> String {
    let (next_saturday, next_sunday) = next_weekend(today);

    format!(
        r#"You are a travel query analyzer that extracts structured information from natural language travel queries.
Your job is to parse the query and identify key components like:

1. Query type (flight search, place info, directions, activity recommendations)
2. Origin location (for travel queries)
3. Destination location(s)
4. Date information (exact dates or relative periods like "next week")
5. Additional preferences or constraints

Format your response as a JSON object with these fields:
{{
    "query_type": "flight" | "poi" | "directions" | "recommendations" | "general" | "transport_comparison",
    "origin": "location name or empty string if not specified",
    "destination": "location name",
    "date_info": {{
        "start_date": "YYYY-MM-DD or empty string",
        "end_date": "YYYY-MM-DD or empty string",
        "duration": "number of days or empty string"
    }},
    "preferences": ["list", "of", "preferences"],
    "structured_query": "a reformatted version of the query optimized for search tools",
    "transport_modes": ["flight", "drive", "bus", "train"] (only for transport_comparison queries)
}}

If the query is about comparing different transportation methods (like "flights vs driving"),
set query_type to "transport_comparison" and list the transport modes in transport_modes array.

For airport codes, use standard airport codes like SFO for San Francisco or FAT for Fresno.

For example, given "I want to fly to Paris from New York next weekend", you would return:
{{
    "query_type": "flight",
    "origin": "New York",
    "destination": "Paris",
    "date_info": {{
        "start_date": "{start}",
        "end_date": "{end}",
        "duration": "2"
    }},
    "preferences": [],
    "structured_query": "flights from New York to Paris departing {start_long}"
}}

For "Should I drive or fly from San Francisco to Yosemite?", return:
{{
    "query_type": "transport_comparison",
    "origin": "San Francisco",
    "destination": "Yosemite",
    "date_info": {{"start_date": "", "end_date": "", "duration": ""}},
    "preferences": [],
    "structured_query": "comparison of driving vs flying from San Francisco to Yosemite",
    "transport_modes": ["drive", "flight"]
}}

Today's date is {today}. Use this to calculate relative dates.
For "this weekend", use {this_weekend}. For "next weekend", use {next_weekend}.
Output ONLY the JSON object."#,
        start = next_saturday.format("%Y-%m-%d"),
        end = next_sunday.format("%Y-%m-%d"),
        start_long = long_date(next_saturday),
        today = long_date(today),
        this_weekend = weekend_span(this_weekend(today)),
        next_weekend = weekend_span(next_weekend(today)),
    )
}
