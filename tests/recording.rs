//! Recording-time contracts: input declaration, element access, the
//! tensor-id map, and shape dispatch failures.

use umbra::{Error, Spy, Tape, Tensor, Trace};

#[test]
fn input_declaration_after_recording_fails() {
    let tape = Tape::new();
    let x = Spy::input(1.0, &tape).unwrap();
    let _y = x.powf(2.0);
    let err = Spy::input(2.0, &tape).unwrap_err();
    assert_eq!(err, Error::DeclarationAfterRecording);
}

#[test]
fn inputs_grow_the_tape_layout() {
    let tape = Tape::new();
    let a = Spy::input(1.0, &tape).unwrap();
    let b = Spy::input(vec![1.0, 2.0, 3.0], &tape).unwrap();
    assert_eq!(a.tape_begin(), 0);
    assert_eq!(b.tape_begin(), 1);
    assert_eq!(b.tape_end(), 4);
    assert_eq!(tape.input_len(), 4);
    assert_eq!(tape.trace_len(), 4);
    assert_eq!(tape.initial_values(), vec![1.0, 1.0, 2.0, 3.0]);
}

#[test]
fn element_access_references_existing_slots() {
    let tape = Tape::new();
    let v = Spy::input(vec![5.0, 6.0, 7.0], &tape).unwrap();
    let ops_before = tape.num_ops();
    let e = v.at(1).unwrap();
    assert_eq!(tape.num_ops(), ops_before, "element access records nothing");
    assert_eq!(e.tape_begin(), v.tape_begin() + 1);
    assert!(e.is_scalar());

    let err = v.at(3).unwrap_err();
    assert_eq!(err, Error::IndexOutOfRange { index: 3, len: 3 });
}

#[test]
fn matrix_element_access_is_column_major() {
    let tape = Tape::new();
    let m = Spy::input(
        Tensor::from_parts(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]),
        &tape,
    )
    .unwrap();
    let e = m.at2(1, 1).unwrap();
    assert_eq!(e.tape_begin(), m.tape_begin() + 3);
    assert!(m.at2(2, 0).is_err());
}

#[test]
fn scalar_element_participates_in_expressions() {
    let tape = Tape::new();
    let v = Spy::input(vec![5.0, 6.0], &tape).unwrap();
    let y = v.at(0).unwrap() * v.at(1).unwrap();
    let mut trace = Trace::new(&tape);
    trace.play();
    assert_eq!(trace.read_scalar(&y), 30.0);
    assert_eq!(trace.partial(0), 6.0);
    assert_eq!(trace.partial(1), 5.0);
    assert_eq!(trace.partial2(0, 1), 1.0);
}

#[test]
fn tensor_map_round_trips() {
    let tape = Tape::new();
    let a = Spy::input_mapped(1.5, 42, &tape).unwrap();
    assert_eq!(a.tensor_id(), Some(42));
    assert_eq!(tape.slot_of(42), Some(a.tape_begin()));
    assert_eq!(tape.tensor_id(a.tape_begin()), Some(42));

    // Declaring the same identifier again re-uses the slots.
    let b = Spy::input_mapped(1.5, 42, &tape).unwrap();
    assert_eq!(b.tape_begin(), a.tape_begin());
    assert_eq!(tape.input_len(), 1);
}

#[test]
#[should_panic(expected = "incompatible tensor dimensions")]
fn mismatched_vector_lengths_panic() {
    let tape = Tape::new();
    let a = Spy::input(vec![1.0, 2.0], &tape).unwrap();
    let b = Spy::input(vec![1.0, 2.0, 3.0], &tape).unwrap();
    let _ = &a + &b;
}
