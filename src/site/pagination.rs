/// 分页器，语义对齐 Django 的 Paginator.get_page：
/// 任何页码输入都收敛到一个有效页面，绝不报错。
pub struct Paginator<T> {
    items: Vec<T>,
    per_page: usize,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, per_page: usize) -> Self {
        Self {
            items,
            per_page: per_page.max(1),
        }
    }

    /// 条目总数
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// 总页数，空列表也算一页
    pub fn num_pages(&self) -> usize {
        if self.items.is_empty() {
            1
        } else {
            (self.items.len() + self.per_page - 1) / self.per_page
        }
    }

    /// 取指定页
    ///
    /// 规则：缺失、空串或非数字 → 第一页；小于 1 或超出总页数 → 最后一页。
    pub fn get_page(&self, number: Option<&str>) -> PageSlice<'_, T> {
        let num_pages = self.num_pages();
        let number = match number.map(str::trim) {
            Some(raw) if !raw.is_empty() => match raw.parse::<i64>() {
                Ok(n) if n < 1 => num_pages,
                Ok(n) if n as usize > num_pages => num_pages,
                Ok(n) => n as usize,
                // 超出 i64 的纯数字串按越界处理
                Err(_) if raw.chars().all(|c| c.is_ascii_digit()) => num_pages,
                Err(_) => 1,
            },
            _ => 1,
        };
        self.page(number)
    }

    fn page(&self, number: usize) -> PageSlice<'_, T> {
        let start = (number - 1) * self.per_page;
        let end = (start + self.per_page).min(self.items.len());
        let items = if start >= self.items.len() {
            &[]
        } else {
            &self.items[start..end]
        };
        PageSlice {
            items,
            number,
            num_pages: self.num_pages(),
            count: self.items.len(),
        }
    }
}

/// 分页结果中的一页
pub struct PageSlice<'a, T> {
    pub items: &'a [T],
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
}

impl<'a, T> PageSlice<'a, T> {
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next().then(|| self.number + 1)
    }
}
