use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct PageContext<T> {
    pub rows: Vec<T>,
    pub total_rows: i64,
    pub page: i64,
    pub page_size: i64,
    pub next_offset: i64,
    pub prev_offset: i64,
    pub page_list: Vec<(String, i64)>,
    pub message: Option<String>,
}

impl<T> PageContext<T> {
    pub fn from_rows(rows: Vec<T>, total_rows: i64, page_size: i64, current_offset: i64) -> Self {
        if rows.is_empty() || page_size <= 0 {
            return Self::no_rows(page_size);
        }
        let last_offset = ((total_rows - 1) / page_size) * page_size;
        let next_offset = (current_offset + page_size).min(last_offset);
        let prev_offset = (current_offset - page_size).max(0);

        let page_count = (total_rows + page_size - 1) / page_size;
        let current_page = current_offset / page_size;

        let page_list = (0..page_count)
            .map(|n| {
                let page = if n == current_page {
                    String::from("...")
                } else {
                    format!("{}", n + 1)
                };

                (page, n * page_size)
            })
            .collect();

        Self {
            rows,
            total_rows,
            page: current_page + 1,
            page_size,
            next_offset,
            prev_offset,
            page_list,
            message: Some(format!(
                "{} - {} / {}",
                current_offset,
                (current_offset + page_size).min(total_rows),
                total_rows
            )),
        }
    }

    pub fn no_rows(page_size: i64) -> Self {
        Self {
            rows: vec![],
            total_rows: 0,
            page: 1,
            page_size,
            next_offset: 0,
            prev_offset: 0,
            page_list: vec![(String::from("1"), 0)],
            message: Some(String::from("No results")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_page_offsets() {
        let page = PageContext::from_rows(vec![(); 10], 25, 10, 10);
        assert_eq!(page.page, 2);
        assert_eq!(page.next_offset, 20);
        assert_eq!(page.prev_offset, 0);
        assert_eq!(page.page_list.len(), 3);
        assert_eq!(page.page_list[1], (String::from("..."), 10));
        assert_eq!(page.message.as_deref(), Some("10 - 20 / 25"));
    }

    #[test]
    fn last_page_does_not_run_past_the_end() {
        let page = PageContext::from_rows(vec![(); 10], 20, 10, 10);
        assert_eq!(page.next_offset, 10);
        assert_eq!(page.page_list.len(), 2);
    }

    #[test]
    fn empty_rows_yield_placeholder() {
        let page: PageContext<()> = PageContext::from_rows(vec![], 0, 10, 0);
        assert_eq!(page.total_rows, 0);
        assert_eq!(page.message.as_deref(), Some("No results"));
    }
}
