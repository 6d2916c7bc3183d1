//! `gantt_tasks` and `gantt_marklines` emission.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::warn;

use crate::sqlgen::stores::StoreRow;
use crate::sqlgen::{clean_value, split_csv_line, sql_quote};

const TASK_AVATAR: &str =
    "https://lf9-dp-fe-cms-tos.byteorg.com/obj/bit-cloud/VTable/gantt/avatar/0.png";
const MARKLINE_DATE: &str = "2025-10-15";
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];

#[derive(Debug, Clone)]
pub struct TaskRow {
    pub title: String,
    pub assignee: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Parse headerless task rows: title, assignee, start date, end date.
/// Rows missing a title or either date are skipped with a warning.
pub fn parse_tasks(contents: &str) -> Vec<TaskRow> {
    let mut rows = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let cell = |index: usize| {
            fields
                .get(index)
                .map(String::as_str)
                .and_then(clean_value)
        };

        let (Some(title), Some(start_raw), Some(end_raw)) = (cell(0), cell(2), cell(3)) else {
            warn!(line = line_no + 1, "Skipping task row with missing title or dates");
            continue;
        };
        let (Some(start), Some(end)) = (parse_date(&start_raw), parse_date(&end_raw)) else {
            warn!(line = line_no + 1, title = %title, "Could not parse task dates; skipping task");
            continue;
        };

        rows.push(TaskRow {
            title,
            assignee: cell(1),
            start,
            end,
        });
    }
    rows
}

pub fn load_tasks(path: &Path) -> Result<Vec<TaskRow>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read task export {}", path.display()))?;
    Ok(parse_tasks(&contents))
}

/// Every task is emitted once per store; ids stay unique through a
/// global counter.
pub fn gantt_tasks_sql(stores: &[StoreRow], tasks: &[TaskRow]) -> Vec<String> {
    let mut statements = Vec::new();
    let mut counter = 0usize;

    for store in stores {
        for task in tasks {
            counter += 1;
            let task_id = format!("task-{}-{}", store.store_id, counter);
            statements.push(format!(
                "INSERT INTO gantt_tasks (id, store_id, title, start, end, progress, avatar) \
                 VALUES ({}, {}, {}, {}, {}, 0, {});",
                sql_quote(&task_id),
                sql_quote(&store.store_id),
                sql_quote(&task.title),
                sql_quote(&task.start.format("%Y-%m-%d").to_string()),
                sql_quote(&task.end.format("%Y-%m-%d").to_string()),
                sql_quote(TASK_AVATAR),
            ));
        }
    }
    statements
}

/// One fixed milestone markline per store.
pub fn gantt_marklines_sql(stores: &[StoreRow]) -> Vec<String> {
    stores
        .iter()
        .map(|store| {
            format!(
                "INSERT INTO gantt_marklines (date, store_id, content, style, contentStyle) \
                 VALUES ({}, {}, {}, '{{}}', '{{\"color\":\"#fff\"}}');",
                sql_quote(MARKLINE_DATE),
                sql_quote(&store.store_id),
                sql_quote(&format!("{} - 阶段里程碑", store.store_name)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlgen::stores::parse_stores;

    const TASKS: &str = "\
签订租赁合同,张三,2025-09-01,2025-09-10
硬装进场,李四,2025/09/11,2025/10/05
缺日期的行,王五,,
日期坏掉的行,赵六,不是日期,2025-10-20
软装与设备,张三,2025-10-06,2025-10-20
";

    #[test]
    fn test_parse_tasks_skips_bad_rows() {
        let tasks = parse_tasks(TASKS);
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].title, "签订租赁合同");
        assert_eq!(tasks[1].start.to_string(), "2025-09-11");
        assert_eq!(tasks[2].assignee.as_deref(), Some("张三"));
    }

    #[test]
    fn test_tasks_cross_join_with_global_counter() {
        let stores = parse_stores("排序,门店名称（区位名称）\n1,甲店\n2,乙店\n");
        let tasks = parse_tasks("开业筹备,张三,2025-09-01,2025-09-30\n");
        let statements = gantt_tasks_sql(&stores, &tasks);

        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("'task-甲店-1'"));
        assert!(statements[1].contains("'task-乙店-2'"));
        assert!(statements[0].contains(", 0, "));
        assert!(statements[0].ends_with(";"));
    }

    #[test]
    fn test_marklines_one_per_store() {
        let stores = parse_stores("排序,门店名称（区位名称）\n1,甲店\n");
        let statements = gantt_marklines_sql(&stores);

        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("'2025-10-15'"));
        assert!(statements[0].contains("甲店 - 阶段里程碑"));
        assert!(statements[0].contains("'{\"color\":\"#fff\"}'"));
    }
}
