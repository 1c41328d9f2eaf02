use chrono::{DateTime, NaiveDate, Utc};

// ===== Политика хранения =====
// Чистые решения над списком имён файлов. Само удаление (и обработку
// его сбоев) выполняет файловый транспорт.

/// Номер поколения из суффикса `{base}.N` или `{base}.N.gz`
pub(crate) fn generation_of(base: &str, name: &str) -> Option<(u32, bool)> {
    let rest = name.strip_prefix(base)?.strip_prefix('.')?;
    let (digits, compressed) = match rest.strip_suffix(".gz") {
        Some(digits) => (digits, true),
        None => (rest, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|generation| (generation, compressed))
}

/// Дата из имени `{pattern}-YYYY-MM-DD...` (строго фиксированный формат)
pub(crate) fn bucket_date_of(pattern: &str, name: &str) -> Option<NaiveDate> {
    let rest = name.strip_prefix(pattern)?.strip_prefix('-')?;
    let date_part = rest.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Разбор ротированного файла гибридного режима:
/// `{pattern}-YYYY-MM-DD.N.log[.gz]`
pub(crate) fn hybrid_generation_of(pattern: &str, name: &str) -> Option<(NaiveDate, u32, bool)> {
    let date = bucket_date_of(pattern, name)?;
    let rest = name.strip_prefix(pattern)?.strip_prefix('-')?;
    let rest = rest.get(10..)?.strip_prefix('.')?;
    let (rest, compressed) = match rest.strip_suffix(".gz") {
        Some(rest) => (rest, true),
        None => (rest, false),
    };
    let digits = rest.strip_suffix(".log")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((date, digits.parse().ok()?, compressed))
}

/// Имена, чья дата строго старше `max_days` относительно `reference`.
/// Имена без распознаваемой даты никогда не попадают в результат.
pub(crate) fn expired_by_age(
    pattern: &str,
    names: &[String],
    reference: DateTime<Utc>,
    max_days: i64,
) -> Vec<String> {
    let today = reference.date_naive();
    names
        .iter()
        .filter(|name| match bucket_date_of(pattern, name) {
            Some(date) => (today - date).num_days() > max_days,
            None => false,
        })
        .cloned()
        .collect()
}

/// Файлы сверх `max_files` самых свежих поколений (1 — самое свежее)
pub(crate) fn overflow_by_count(base: &str, names: &[String], max_files: usize) -> Vec<String> {
    let mut numbered: Vec<(u32, &String)> = names
        .iter()
        .filter_map(|name| generation_of(base, name).map(|(generation, _)| (generation, name)))
        .collect();
    numbered.sort_by_key(|&(generation, _)| generation);
    numbered
        .into_iter()
        .skip(max_files)
        .map(|(_, name)| name.clone())
        .collect()
}

/// То же для гибридного режима: поколения нумеруются внутри дня,
/// поэтому свежесть определяется парой (дата, номер) по убыванию
pub(crate) fn hybrid_overflow_by_count(
    pattern: &str,
    names: &[String],
    max_files: usize,
) -> Vec<String> {
    let mut numbered: Vec<((NaiveDate, u32), &String)> = names
        .iter()
        .filter_map(|name| {
            hybrid_generation_of(pattern, name).map(|(date, generation, _)| ((date, generation), name))
        })
        .collect();
    numbered.sort_by(|a, b| b.0.cmp(&a.0));
    numbered
        .into_iter()
        .skip(max_files)
        .map(|(_, name)| name.clone())
        .collect()
}
