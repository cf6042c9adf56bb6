//! User-facing chat texts.

use crate::session::TagMode;

pub const REFUSAL: &str = "Извини, это приватный бот. У тебя нет доступа.";

pub const TEXT_PROCESSING: &str = "Обрабатываю текст через LLM...";
pub const VOICE_PROCESSING: &str = "Преобразую голос в текст...";
pub const PHOTO_PROCESSING: &str = "Сохраняю фото...";
pub const PDF_EXTRACTING: &str = "Извлекаю текст из PDF...";
pub const PDF_SUMMARIZING: &str = "Готовлю конспект через LLM...";
pub const TAGS_PROCESSING: &str = "Добавляю теги к заметке в Mem.ai...";
pub const TAGS_DONE: &str = "Готово! Теги добавлены. Можешь отправить следующую мысль.";

pub const NO_VOICE: &str = "Не удалось получить голосовое сообщение.";
pub const NO_PHOTO: &str = "Не удалось получить фото.";
pub const NO_DOCUMENT: &str = "Не удалось получить документ.";
pub const NOT_PDF: &str = "Поддерживаются только PDF-документы.";
pub const PDF_EMPTY: &str = "Не удалось извлечь текст из PDF.";

pub const ADDTAG_USAGE: &str = "Использование: /addtag <тег> <описание>\nНапример: /addtag rust Заметки про Rust";

/// What kind of input produced a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    Text,
    Voice,
    Photo,
    Pdf,
}

/// Completion message after a note was created.
pub fn note_saved(kind: NoteKind, mode: TagMode) -> String {
    let head = match kind {
        NoteKind::Text => "Записал мысль в Mem.ai.",
        NoteKind::Voice => "Голосовое сохранено в Mem.ai.",
        NoteKind::Photo => "Фото сохранено в Mem.ai.",
        NoteKind::Pdf => "Конспект PDF сохранён в Mem.ai.",
    };
    let tail = match (mode, kind) {
        (TagMode::Inline, _) => "Теги можно писать прямо в тексте сообщения, например #ai.",
        (TagMode::Pending, NoteKind::Text) => {
            "Теперь отправь сообщение с тегами (через запятую, можно с `#`)."
        }
        (TagMode::Pending, _) => "Теперь отправь сообщение с тегами для этой заметки.",
    };
    format!("{head}\n{tail}")
}

/// Greeting for `/start`.
pub fn start(mode: TagMode) -> String {
    let tags_hint = match mode {
        TagMode::Inline => "Теги пиши прямо в тексте (#ai, #robot). Список тегов: /tags.",
        TagMode::Pending => "После сохранения я попрошу прислать теги для заметки. Список тегов: /tags.",
    };
    format!(
        "Привет! Я бот, который сохраняет твои мысли в Mem.ai.\n\n\
        Отправь текст, голосовое, фото или PDF — я сохраню заметку.\n\
        {tags_hint}\n\
        Новый тег: /addtag <тег> <описание>."
    )
}

pub fn tag_saved(name: &str) -> String {
    format!("Тег #{name} сохранён.")
}

pub fn unknown_command(command: &str) -> String {
    format!("Неизвестная команда: {command}\n\nСписок команд: /help")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_saved_mentions_tags_per_mode() {
        assert!(note_saved(NoteKind::Text, TagMode::Inline).starts_with("Записал мысль"));
        assert!(note_saved(NoteKind::Text, TagMode::Inline).contains("прямо в тексте"));
        assert!(note_saved(NoteKind::Photo, TagMode::Pending).contains("отправь сообщение с тегами"));
    }

    #[test]
    fn test_start_differs_by_mode() {
        assert_ne!(start(TagMode::Inline), start(TagMode::Pending));
        assert!(start(TagMode::Inline).starts_with("Привет!"));
    }
}
