// dates.rs
//
// Free-form date entry for the add/edit form: "tomorrow", "fri 15:30",
// "next monday", "in 2 hours", "2026-03-01 09:00", "5:30pm".

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Moment {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Parses a due date. Time components are accepted and dropped.
pub fn parse_due_date(input: &str, now: NaiveDateTime) -> Result<NaiveDate, String> {
    let date = match parse_moment(input, now)? {
        Moment::Date(d) => d,
        Moment::DateTime(dt) => dt.date(),
    };
    if date < now.date() {
        return Err("Due date cannot be in the past".to_string());
    }
    Ok(date)
}

/// Parses a reminder time. A bare date is rejected: an alarm needs a clock time.
pub fn parse_reminder_time(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, String> {
    let at = match parse_moment(input, now)? {
        Moment::DateTime(dt) => dt,
        Moment::Date(_) => return Err("Reminder needs a time, e.g. 'tomorrow 09:00'".to_string()),
    };
    // one minute of slack so "14:00" typed at 14:00:40 still counts as now
    if at.checked_add_signed(TimeDelta::minutes(1)).is_some_and(|slack| slack <= now) {
        return Err("Reminder time cannot be in the past".to_string());
    }
    Ok(at)
}

fn parse_moment(input: &str, now: NaiveDateTime) -> Result<Moment, String> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return Err("Please enter a date".to_string());
    }
    let today = now.date();
    let words: Vec<&str> = input.split_whitespace().collect();

    match words.as_slice() {
        ["now"] => Ok(Moment::DateTime(now)),
        [rel] if relative_day(rel, today).is_some() => {
            relative_day(rel, today).map(Moment::Date).ok_or_else(unreachable_day)
        }
        [day] if weekday(day).is_some() => Ok(Moment::Date(upcoming(today, weekday(day), 0))),
        ["next", day] if weekday(day).is_some() => Ok(Moment::Date(upcoming(today, weekday(day), 7))),
        ["this", day] if weekday(day).is_some() => Ok(Moment::Date(this_week(today, weekday(day)))),
        ["week"] | ["next", "week"] => Ok(Moment::Date(today + TimeDelta::days(7))),
        ["month"] | ["next", "month"] => Ok(Moment::Date(today + TimeDelta::days(30))),

        ["in", num, unit] => shift(now, &[(*num, *unit)]).map(Moment::DateTime),
        ["in", n1, u1, n2, u2] => shift(now, &[(*n1, *u1), (*n2, *u2)]).map(Moment::DateTime),

        [date, time] if parse_date(date, today).is_some() => {
            let date = parse_date(date, today).ok_or_else(unreachable_day)?;
            Ok(Moment::DateTime(date.and_time(parse_time(time)?)))
        }
        [rel, time] if relative_day(rel, today).is_some() => {
            let date = relative_day(rel, today).ok_or_else(unreachable_day)?;
            Ok(Moment::DateTime(date.and_time(parse_time(time)?)))
        }
        [day, time] if weekday(day).is_some() => {
            Ok(Moment::DateTime(upcoming(today, weekday(day), 0).and_time(parse_time(time)?)))
        }
        ["next", day, time] if weekday(day).is_some() => {
            Ok(Moment::DateTime(upcoming(today, weekday(day), 7).and_time(parse_time(time)?)))
        }
        ["this", day, time] if weekday(day).is_some() => {
            Ok(Moment::DateTime(this_week(today, weekday(day)).and_time(parse_time(time)?)))
        }

        [num, unit] => shift(now, &[(*num, *unit)]).map(Moment::DateTime),
        [n1, u1, n2, u2] => shift(now, &[(*n1, *u1), (*n2, *u2)]).map(Moment::DateTime),

        [single] => {
            if let Some(date) = parse_date(single, today) {
                return Ok(Moment::Date(date));
            }
            parse_time(single)
                .map(|t| Moment::DateTime(today.and_time(t)))
                .map_err(|_| "Unrecognized date format".to_string())
        }
        _ => Err("Unrecognized date format".to_string()),
    }
}

fn unreachable_day() -> String {
    "Invalid date".to_string()
}

fn relative_day(word: &str, today: NaiveDate) -> Option<NaiveDate> {
    match word {
        "today" => Some(today),
        "tomorrow" | "tmr" => today.succ_opt(),
        _ => None,
    }
}

fn weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Next occurrence strictly after today, pushed `extra_days` further.
fn upcoming(today: NaiveDate, target: Option<Weekday>, extra_days: i64) -> NaiveDate {
    let target = target.unwrap_or(today.weekday());
    let mut days = i64::from(target.num_days_from_monday()) - i64::from(today.weekday().num_days_from_monday());
    if days <= 0 {
        days += 7;
    }
    if extra_days > 0 && days < 7 {
        days += extra_days;
    }
    today + TimeDelta::days(days)
}

/// The given weekday in the current Monday-based week; today if it already passed.
fn this_week(today: NaiveDate, target: Option<Weekday>) -> NaiveDate {
    let target = target.unwrap_or(today.weekday());
    let days = i64::from(target.num_days_from_monday()) - i64::from(today.weekday().num_days_from_monday());
    today + TimeDelta::days(days.max(0))
}

fn parse_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-{}", today.year(), s), "%Y-%m-%d").ok())
}

fn parse_time(s: &str) -> Result<NaiveTime, String> {
    let invalid = || "Invalid time format. Use HH:MM or 5:30pm".to_string();
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Ok(t);
    }
    let (body, pm) = if let Some(b) = s.strip_suffix("pm") {
        (b.trim(), true)
    } else if let Some(b) = s.strip_suffix("am") {
        (b.trim(), false)
    } else {
        return Err(invalid());
    };
    let t = NaiveTime::parse_from_str(body, "%H:%M")
        .ok()
        .or_else(|| body.parse::<u32>().ok().and_then(|h| NaiveTime::from_hms_opt(h, 0, 0)))
        .filter(|t| (1..=12).contains(&t.hour()))
        .ok_or_else(invalid)?;
    let hour = match (pm, t.hour()) {
        (true, 12) => 12,
        (true, h) => h + 12,
        (false, 12) => 0,
        (false, h) => h,
    };
    t.with_hour(hour).ok_or_else(invalid)
}

fn out_of_range() -> String {
    "Date out of range".to_string()
}

/// `now` moved forward by the sum of the given amounts.
fn shift(now: NaiveDateTime, parts: &[(&str, &str)]) -> Result<NaiveDateTime, String> {
    let mut total = TimeDelta::zero();
    for (num, unit) in parts {
        total = total.checked_add(&duration(num, unit)?).ok_or_else(out_of_range)?;
    }
    now.checked_add_signed(total).ok_or_else(out_of_range)
}

fn duration(num: &str, unit: &str) -> Result<TimeDelta, String> {
    let n: i64 = num.parse().map_err(|_| format!("Invalid number '{}'", num))?;
    if n < 0 {
        return Err("Duration cannot be negative".to_string());
    }
    let delta = match unit {
        "minute" | "minutes" | "min" | "mins" | "m" => TimeDelta::try_minutes(n),
        "hour" | "hours" | "hr" | "hrs" | "h" => TimeDelta::try_hours(n),
        "day" | "days" | "d" => TimeDelta::try_days(n),
        "week" | "weeks" | "w" => n.checked_mul(7).and_then(TimeDelta::try_days),
        _ => return Err(format!("Unsupported time unit '{}'", unit)),
    };
    delta.ok_or_else(out_of_range)
}
