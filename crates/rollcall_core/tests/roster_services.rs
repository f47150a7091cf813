use chrono::NaiveDate;
use rollcall_core::db::open_db;
use rollcall_core::{
    AttendanceService, AttendanceStatus, ClassPatch, ClassService, ClassServiceError,
    MemoryStore, NewStudent, SqliteAttendanceRepository, SqliteClassRepository,
    SqliteStudentRepository, StudentPatch, StudentService, StudentServiceError,
};

fn new_student(student_id: &str, class_id: &str) -> NewStudent {
    NewStudent {
        student_id: student_id.to_string(),
        name: format!("Student {student_id}"),
        class_id: class_id.to_string(),
        photo_path: format!("uploads/student_photos/{student_id}.jpg"),
    }
}

#[test]
fn add_student_requires_existing_class() {
    let store = MemoryStore::new();
    let students = StudentService::new(store.students(), store.classes());

    let err = students.add_student(new_student("S1", "nope")).unwrap_err();
    assert!(matches!(err, StudentServiceError::ClassNotFound(ref id) if id == "nope"));
    assert!(students.list_students().unwrap().is_empty());
}

#[test]
fn duplicate_student_id_fails_and_leaves_store_unchanged() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let class = classes.create_class("Maths").unwrap();

    let first = students.add_student(new_student("S1", &class.id)).unwrap();
    let mut second = new_student("S1", &class.id);
    second.name = "Someone Else".to_string();
    let err = students.add_student(second).unwrap_err();

    assert!(matches!(err, StudentServiceError::DuplicateStudent(ref id) if id == "S1"));
    assert_eq!(err.to_string(), "student ID S1 already exists");
    assert_eq!(students.list_students().unwrap(), vec![first]);
}

#[test]
fn add_student_rejects_blank_fields() {
    let store = MemoryStore::new();
    let students = StudentService::new(store.students(), store.classes());
    let mut input = new_student("S1", "C1");
    input.name = "   ".to_string();

    let err = students.add_student(input).unwrap_err();
    assert!(matches!(err, StudentServiceError::Invalid(_)));
}

#[test]
fn update_student_moves_between_existing_classes_only() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let maths = classes.create_class("Maths").unwrap();
    let physics = classes.create_class("Physics").unwrap();
    students.add_student(new_student("S1", &maths.id)).unwrap();

    let moved = students
        .update_student(
            "S1",
            &StudentPatch {
                class_id: Some(physics.id.clone()),
                ..StudentPatch::default()
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(moved.class_id, physics.id);
    assert_eq!(students.list_by_class(&physics.id).unwrap().len(), 1);
    assert!(students.list_by_class(&maths.id).unwrap().is_empty());

    let err = students
        .update_student(
            "S1",
            &StudentPatch {
                class_id: Some("missing".to_string()),
                ..StudentPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, StudentServiceError::ClassNotFound(_)));

    assert!(students
        .update_student("ghost", &StudentPatch::default())
        .unwrap()
        .is_none());
}

#[test]
fn empty_patch_returns_student_unchanged() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let maths = classes.create_class("Maths").unwrap();
    let added = students.add_student(new_student("S1", &maths.id)).unwrap();

    let same = students
        .update_student("S1", &StudentPatch::default())
        .unwrap()
        .unwrap();
    assert_eq!(same, added);
    assert!(same.updated_at.is_none());
}

#[test]
fn check_enrollment_covers_every_rejection_without_writing() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let maths = classes.create_class("Maths").unwrap();

    students.check_enrollment(&new_student("S1", &maths.id)).unwrap();
    assert!(students.list_students().unwrap().is_empty());

    let missing_class = students
        .check_enrollment(&new_student("S1", "nope"))
        .unwrap_err();
    assert!(matches!(missing_class, StudentServiceError::ClassNotFound(_)));

    let mut blank = new_student("S1", &maths.id);
    blank.name = "  ".to_string();
    let blank = students.check_enrollment(&blank).unwrap_err();
    assert!(matches!(blank, StudentServiceError::Invalid(_)));

    students.add_student(new_student("S1", &maths.id)).unwrap();
    let taken = students
        .check_enrollment(&new_student(" S1 ", &maths.id))
        .unwrap_err();
    assert!(matches!(taken, StudentServiceError::DuplicateStudent(ref id) if id == "S1"));
}

#[test]
fn delete_student_reports_whether_removed_and_keeps_history() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let attendance = AttendanceService::new(store.students(), store.attendance());
    let class = classes.create_class("Maths").unwrap();
    students.add_student(new_student("S1", &class.id)).unwrap();
    attendance
        .manual_mark(
            "S1",
            &class.id,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            AttendanceStatus::Present,
        )
        .unwrap();

    assert!(students.delete_student("S1").unwrap());
    assert!(!students.delete_student("S1").unwrap());
    assert_eq!(attendance.student_history("S1").unwrap().len(), 1);
}

#[test]
fn class_delete_is_blocked_while_referenced() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());
    let students = StudentService::new(store.students(), store.classes());
    let attendance = AttendanceService::new(store.students(), store.attendance());
    let class = classes.create_class("Maths").unwrap();
    students.add_student(new_student("S1", &class.id)).unwrap();
    let record = attendance
        .manual_mark(
            "S1",
            &class.id,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            AttendanceStatus::Absent,
        )
        .unwrap();

    let err = classes.delete_class(&class.id).unwrap_err();
    assert!(matches!(
        err,
        ClassServiceError::ClassInUse {
            students: 1,
            attendance_records: 1,
            ..
        }
    ));

    students.delete_student("S1").unwrap();
    assert!(matches!(
        classes.delete_class(&class.id),
        Err(ClassServiceError::ClassInUse { students: 0, .. })
    ));

    assert!(attendance.delete_record(record.id).unwrap());
    assert!(classes.delete_class(&class.id).unwrap());
    assert!(!classes.delete_class(&class.id).unwrap());
    assert!(classes.get_class(&class.id).unwrap().is_none());
}

#[test]
fn class_create_and_rename() {
    let store = MemoryStore::new();
    let classes = ClassService::new(store.classes(), store.students(), store.attendance());

    assert!(matches!(
        classes.create_class("  "),
        Err(ClassServiceError::Invalid(_))
    ));
    let class = classes.create_class(" Maths ").unwrap();
    assert_eq!(class.name, "Maths");

    let renamed = classes
        .update_class(
            &class.id,
            &ClassPatch {
                name: Some("Algebra".to_string()),
            },
        )
        .unwrap()
        .unwrap();
    assert_eq!(renamed.name, "Algebra");
    assert_eq!(classes.list_classes().unwrap(), vec![renamed]);
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rollcall.sqlite3");
    let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    let class_id = {
        let conn = open_db(&path).unwrap();
        let classes = ClassService::new(
            SqliteClassRepository::new(&conn),
            SqliteStudentRepository::new(&conn),
            SqliteAttendanceRepository::new(&conn),
        );
        let students = StudentService::new(
            SqliteStudentRepository::new(&conn),
            SqliteClassRepository::new(&conn),
        );
        let attendance = AttendanceService::new(
            SqliteStudentRepository::new(&conn),
            SqliteAttendanceRepository::new(&conn),
        );
        let class = classes.create_class("Maths").unwrap();
        students.add_student(new_student("S1", &class.id)).unwrap();
        students.add_student(new_student("S2", &class.id)).unwrap();
        attendance
            .manual_mark("S2", &class.id, date, AttendanceStatus::Present)
            .unwrap();
        class.id
    };

    let conn = open_db(&path).unwrap();
    let attendance = AttendanceService::new(
        SqliteStudentRepository::new(&conn),
        SqliteAttendanceRepository::new(&conn),
    );
    let report = attendance.class_report(&class_id, date).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].record.student_id, "S2");
    assert_eq!(report[0].record.status, AttendanceStatus::Present);
}
