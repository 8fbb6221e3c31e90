use std::collections::{BTreeMap, HashMap};

use domain_schedule_models::{
    DaySchedule, LessonLine, MergedLesson, RawLesson, TeacherContact,
};
use log::debug;

use crate::time::{parse_upstream_date, NaiveDateExt};

/// Group raw lessons of one week by their local date key and merge each day.
///
/// Lessons with a missing or unparsable date are dropped.
pub(crate) fn group_week(raw_lessons: Vec<RawLesson>) -> BTreeMap<String, DaySchedule> {
    let mut by_date = BTreeMap::<String, Vec<RawLesson>>::new();
    let mut dropped = 0usize;
    for lesson in raw_lessons {
        match parse_upstream_date(&lesson.date) {
            Some(date) => by_date.entry(date.date_key()).or_default().push(lesson),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("Dropped {dropped} lessons without a valid date");
    }
    by_date
        .into_iter()
        .map(|(date_key, lessons)| (date_key, merge_day_lessons(lessons)))
        .collect()
}

/// Collapse the raw lessons of a single day into display slots.
///
/// Slots are identified by `(discipline, kind, begin, end)` and ordered by begin time.
/// The order of slots with equal begin time follows the first appearance in `raw_lessons`.
pub fn merge_day_lessons(raw_lessons: Vec<RawLesson>) -> DaySchedule {
    let mut slots = Vec::<MergedLesson>::new();
    let mut slot_by_key = HashMap::<(String, String, String, String), usize>::new();

    for raw in raw_lessons {
        let key = (
            raw.discipline.trim().to_owned(),
            raw.kind.trim().to_owned(),
            raw.begin.trim().to_owned(),
            raw.end.trim().to_owned(),
        );
        let idx = *slot_by_key.entry(key).or_insert_with_key(|(discipline, kind, begin, end)| {
            slots.push(MergedLesson {
                is_foreign: is_foreign_language(discipline),
                discipline: discipline.to_owned(),
                kind: kind.to_owned(),
                begin: begin.to_owned(),
                end: end.to_owned(),
                pair_no: 0,
                lines: vec![],
                contacts: vec![],
            });
            slots.len() - 1
        });
        let slot = &mut slots[idx];

        let line = LessonLine {
            teacher: raw.teacher.trim().to_owned(),
            room: raw.room.trim().to_owned(),
        };
        if (!line.teacher.is_empty() || !line.room.is_empty()) && !slot.lines.contains(&line) {
            slot.lines.push(line);
        }

        let contact_name = match raw.teacher_title.trim() {
            "" => raw.teacher.trim(),
            title => title,
        };
        let contact = TeacherContact {
            name: contact_name.to_owned(),
            email: raw.teacher_email.trim().to_owned(),
        };
        if (!contact.name.is_empty() || !contact.email.is_empty())
            && !slot.contacts.contains(&contact)
        {
            slot.contacts.push(contact);
        }
    }

    // stable sort, equal begin times keep the order of first appearance
    slots.sort_by_cached_key(|slot| to_hhmm(&slot.begin));
    for (position, slot) in slots.iter_mut().enumerate() {
        slot.pair_no = pair_no_by_time(&slot.begin, &slot.end)
            .unwrap_or_else(|| u8::try_from(position + 1).unwrap_or(u8::MAX));
    }
    DaySchedule { lessons: slots }
}

/// Normalize a time string to zero-padded `HH:MM`. Dots are accepted as separators.
pub fn to_hhmm(time: &str) -> String {
    let time = time.trim();
    if time.is_empty() {
        return String::new();
    }
    let time = time.replace('.', ":");
    let mut parts = time.split(':');
    let hours = parts.next().unwrap_or_default();
    let minutes = parts.next().unwrap_or_default();
    format!("{hours:0>2}:{minutes:0>2}")
}

/// Position of the `begin..end` slot in the university timetable.
pub fn pair_no_by_time(begin: &str, end: &str) -> Option<u8> {
    match (to_hhmm(begin).as_str(), to_hhmm(end).as_str()) {
        ("08:30", "10:00") => Some(1),
        ("10:10", "11:40") => Some(2),
        ("11:50", "13:20") => Some(3),
        ("14:00", "15:30") => Some(4),
        ("15:40", "17:10") => Some(5),
        ("17:20", "18:50") => Some(6),
        ("18:55", "20:25") => Some(7),
        ("20:30", "22:00") => Some(8),
        _ => None,
    }
}

fn is_foreign_language(discipline: &str) -> bool {
    discipline.to_lowercase().contains("иностран")
}

#[cfg(test)]
mod tests {
    use domain_schedule_models::{DaySchedule, LessonLine, RawLesson};

    use crate::dto::ruz::RuzLesson;

    use super::{group_week, merge_day_lessons, pair_no_by_time, to_hhmm};

    fn raw(discipline: &str, begin: &str, end: &str, teacher: &str, room: &str) -> RawLesson {
        RawLesson {
            discipline: discipline.to_owned(),
            kind: "Лекции".to_owned(),
            begin: begin.to_owned(),
            end: end.to_owned(),
            teacher: teacher.to_owned(),
            room: room.to_owned(),
            date: "2024.09.02".to_owned(),
            ..Default::default()
        }
    }

    /// Expand merged slots back to one raw lesson per line
    fn expand(day: &DaySchedule) -> Vec<RawLesson> {
        day.lessons
            .iter()
            .flat_map(|slot| {
                slot.lines.iter().map(|line| RawLesson {
                    discipline: slot.discipline.clone(),
                    kind: slot.kind.clone(),
                    begin: slot.begin.clone(),
                    end: slot.end.clone(),
                    teacher: line.teacher.clone(),
                    room: line.room.clone(),
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_two_teachers_merge_into_one_slot() {
        let day = merge_day_lessons(vec![
            raw("Английский язык", "10:10", "11:40", "Смит", "101"),
            raw("Английский язык", "10:10", "11:40", "Джонс", "102"),
            raw("Английский язык", "10:10", "11:40", "Смит", "101"),
        ]);

        assert_eq!(day.len(), 1);
        let slot = &day.lessons[0];
        assert_eq!(slot.pair_no, 2);
        assert_eq!(
            slot.lines,
            vec![
                LessonLine { teacher: "Смит".to_owned(), room: "101".to_owned() },
                LessonLine { teacher: "Джонс".to_owned(), room: "102".to_owned() },
            ]
        );
    }

    #[test]
    fn test_two_lecturers_of_one_lecture_from_upstream_json() {
        let lessons: Vec<RuzLesson> = serde_json::from_str(
            r#"[
                {"discipline": "Математика", "kindOfWork": "ЛК", "beginLesson": "08:30", "endLesson": "10:00",
                 "lecturer": "Иванов", "room": "101", "date": "2024.09.02"},
                {"discipline": "Математика", "kindOfWork": "ЛК", "beginLesson": "08:30", "endLesson": "10:00",
                 "lecturer": "Петров", "room": "101", "date": "2024.09.02"}
            ]"#,
        )
        .unwrap();

        let day = merge_day_lessons(lessons.into_iter().map(RawLesson::from).collect());

        assert_eq!(day.len(), 1);
        let slot = &day.lessons[0];
        assert_eq!(slot.discipline, "Математика");
        assert_eq!(slot.pair_no, 1);
        assert_eq!(
            slot.lines,
            vec![
                LessonLine { teacher: "Иванов".to_owned(), room: "101".to_owned() },
                LessonLine { teacher: "Петров".to_owned(), room: "101".to_owned() },
            ]
        );
    }

    #[test]
    fn test_different_kind_is_a_different_slot() {
        let mut seminar = raw("Математика", "08:30", "10:00", "Иванов", "101");
        seminar.kind = "Семинар".to_owned();
        let day = merge_day_lessons(vec![raw("Математика", "08:30", "10:00", "Иванов", "101"), seminar]);
        assert_eq!(day.len(), 2);
        assert!(day.lessons.iter().all(|it| it.pair_no == 1));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let day = merge_day_lessons(vec![
            raw("Математика", "14:00", "15:30", "Иванов", "101"),
            raw("Физика", "08:30", "10:00", "Петров", "202"),
            raw("Математика", "14:00", "15:30", "Сидоров", "103"),
        ]);
        let merged_twice = merge_day_lessons(expand(&day));
        assert_eq!(merged_twice.lessons.len(), day.lessons.len());
        for (a, b) in day.lessons.iter().zip(merged_twice.lessons.iter()) {
            assert_eq!(a.discipline, b.discipline);
            assert_eq!(a.pair_no, b.pair_no);
            assert_eq!(a.lines, b.lines);
        }
    }

    #[test]
    fn test_known_pair_numbers_do_not_depend_on_input_order() {
        let forward = merge_day_lessons(vec![
            raw("А", "08:30", "10:00", "", "1"),
            raw("Б", "11:50", "13:20", "", "2"),
            raw("В", "18:55", "20:25", "", "3"),
        ]);
        let backward = merge_day_lessons(vec![
            raw("В", "18:55", "20:25", "", "3"),
            raw("Б", "11:50", "13:20", "", "2"),
            raw("А", "08:30", "10:00", "", "1"),
        ]);
        let numbers = |day: &DaySchedule| day.lessons.iter().map(|it| it.pair_no).collect::<Vec<_>>();
        assert_eq!(numbers(&forward), vec![1, 3, 7]);
        assert_eq!(numbers(&backward), vec![1, 3, 7]);
    }

    #[test]
    fn test_unusual_time_falls_back_to_position() {
        let day = merge_day_lessons(vec![
            raw("Физкультура", "9:00", "10:30", "", ""),
            raw("Математика", "08:30", "10:00", "", ""),
            raw("Семинар", "12:00", "13:00", "", ""),
        ]);
        let numbers = day.lessons.iter().map(|it| it.pair_no).collect::<Vec<_>>();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(day.lessons[1].discipline, "Физкультура");
        assert!(day.lessons.iter().all(|it| it.lines.is_empty()));
    }

    #[test]
    fn test_foreign_language_flag() {
        let day = merge_day_lessons(vec![
            raw("Иностранный язык", "08:30", "10:00", "", ""),
            raw("ИНОСТРАННЫЙ ЯЗЫК В ПРОФ. СФЕРЕ", "10:10", "11:40", "", ""),
            raw("Математика", "11:50", "13:20", "", ""),
        ]);
        let flags = day.lessons.iter().map(|it| it.is_foreign).collect::<Vec<_>>();
        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_contacts_are_unique() {
        let mut first = raw("Математика", "08:30", "10:00", "Иванов И.И.", "101");
        first.teacher_title = "Иванов Иван Иванович".to_owned();
        first.teacher_email = "ivanov@example.org".to_owned();
        let mut second = first.clone();
        second.room = "102".to_owned();
        let no_contact = raw("Математика", "08:30", "10:00", "", "103");

        let day = merge_day_lessons(vec![first, second, no_contact]);
        let slot = &day.lessons[0];
        assert_eq!(slot.lines.len(), 3);
        assert_eq!(slot.contacts.len(), 1);
        assert_eq!(slot.contacts[0].name, "Иванов Иван Иванович");
        assert_eq!(slot.contacts[0].email, "ivanov@example.org");
    }

    #[test]
    fn test_group_week_drops_bad_dates() {
        let mut second_day = raw("Физика", "08:30", "10:00", "", "");
        second_day.date = "03.09.2024".to_owned();
        let mut broken = raw("Химия", "08:30", "10:00", "", "");
        broken.date = "когда-нибудь".to_owned();
        let mut empty = raw("Химия", "08:30", "10:00", "", "");
        empty.date = String::new();

        let week = group_week(vec![raw("Математика", "08:30", "10:00", "", ""), second_day, broken, empty]);

        assert_eq!(week.keys().collect::<Vec<_>>(), vec!["2024-09-02", "2024-09-03"]);
        assert_eq!(week["2024-09-03"].lessons[0].discipline, "Физика");
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_day_lessons(vec![]).is_empty());
        assert!(group_week(vec![]).is_empty());
    }

    #[test]
    fn test_to_hhmm() {
        assert_eq!(to_hhmm("8:30"), "08:30");
        assert_eq!(to_hhmm(" 10.10 "), "10:10");
        assert_eq!(to_hhmm("9"), "09:00");
        assert_eq!(to_hhmm(""), "");
        assert_eq!(pair_no_by_time("8.30", "10.00"), Some(1));
        assert_eq!(pair_no_by_time("20:30", "22:00"), Some(8));
        assert_eq!(pair_no_by_time("20:30", "21:00"), None);
    }
}
