/// OCR 得到的单页文本
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 页码，从 1 开始
    pub index: usize,
    pub text: String,
}

impl PageText {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// 渲染为 `--- Page N ---\n<text>\n\n`
    pub fn render(&self) -> String {
        format!("--- Page {} ---\n{}\n\n", self.index, self.text)
    }
}

/// 按页序拼接整份文档
pub fn render_document(pages: &[PageText]) -> String {
    pages.iter().map(PageText::render).collect()
}
