mod harness;

use harness::*;
use jvmfold::analysis::{Analyzer, BlockId, ControlFlowGraph, Settings, Value};
use jvmfold::jvm::code::{InsnIndex, Instruction::*, OrdComparison};

#[test]
fn joins_keep_only_agreeing_values() {
    init_logging();

    // int a, b; if (x == 0) { a = 3; b = 2; } else { a = 3; b = 1; } return a + b;
    let method = static_method(
        "join",
        "(I)I",
        3,
        2,
        vec![
            ILoad(0),
            If(OrdComparison::EQ, InsnIndex(7)),
            IConst3,
            IStore(1),
            IConst1,
            IStore(2),
            Goto(InsnIndex(11)),
            IConst3,
            IStore(1),
            IConst2,
            IStore(2),
            ILoad(1),
            ILoad(2),
            IAdd,
            IReturn,
        ],
    );
    let cfg = blocks(15, &[0, 2, 7, 11], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    assert_eq!(
        frames.before(InsnIndex(11)).unwrap().locals,
        vec![Value::INT, int(3), Value::TOP]
    );
    assert_eq!(frames.before(InsnIndex(13)).unwrap().stack, vec![int(3), Value::TOP]);
    assert_eq!(frames.before(InsnIndex(14)).unwrap().stack, vec![Value::INT]);

    // Both arms are still analyzed with what they know
    assert_eq!(frames.before(InsnIndex(6)).unwrap().locals[2], int(1));
    assert_eq!(frames.before(InsnIndex(11)).unwrap().locals[1].as_int(), Some(3));
}

#[test]
fn joined_wide_values_keep_two_slots() {
    init_logging();

    // x == 0 ? 0L : 1L, then discarded
    let method = static_method(
        "wideStack",
        "(I)V",
        1,
        2,
        vec![
            ILoad(0),
            If(OrdComparison::EQ, InsnIndex(4)),
            LConst1,
            Goto(InsnIndex(5)),
            LConst0,
            Pop2,
            Return,
        ],
    );
    let cfg = blocks(7, &[0, 2, 4, 5], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    let join = frames.before(InsnIndex(5)).unwrap();
    assert_eq!(join.stack, vec![Value::WIDE_TOP]);
    assert_eq!(join.stack_depth(), 2);
    assert!(frames.before(InsnIndex(6)).unwrap().stack.is_empty());
}

#[test]
fn joined_wide_locals_keep_their_continuation() {
    init_logging();

    // long l = x == 0 ? 0L : 1L; return l + l;
    let method = static_method(
        "wideLocal",
        "(I)J",
        3,
        4,
        vec![
            ILoad(0),
            If(OrdComparison::EQ, InsnIndex(5)),
            LConst1,
            LStore(1),
            Goto(InsnIndex(7)),
            LConst0,
            LStore(1),
            LLoad(1),
            Dup2,
            LAdd,
            LReturn,
        ],
    );
    let cfg = blocks(11, &[0, 2, 5, 7], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    assert_eq!(
        frames.before(InsnIndex(7)).unwrap().locals,
        vec![Value::INT, Value::WIDE_TOP, Value::CONTINUATION]
    );
    assert_eq!(
        frames.before(InsnIndex(9)).unwrap().stack,
        vec![Value::WIDE_TOP, Value::WIDE_TOP]
    );
    assert_eq!(frames.before(InsnIndex(10)).unwrap().stack, vec![Value::LONG]);
}

#[test]
fn joined_doubles_under_a_narrow_value() {
    init_logging();

    let method = static_method(
        "wideShuffle",
        "(I)V",
        1,
        5,
        vec![
            IConst5,
            ILoad(0),
            If(OrdComparison::EQ, InsnIndex(5)),
            DConst1,
            Goto(InsnIndex(6)),
            DConst0,
            Dup2X1,
            Pop2,
            Pop,
            Pop2,
            Return,
        ],
    );
    let cfg = blocks(11, &[0, 3, 5, 6], &[(0, 1), (0, 2), (1, 3), (2, 3)]);
    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    assert_eq!(
        frames.before(InsnIndex(6)).unwrap().stack,
        vec![int(5), Value::WIDE_TOP]
    );
    assert_eq!(
        frames.before(InsnIndex(7)).unwrap().stack,
        vec![Value::WIDE_TOP, int(5), Value::WIDE_TOP]
    );
    assert!(frames.before(InsnIndex(10)).unwrap().stack.is_empty());
}

#[test]
fn loop_counters_lose_their_literal() {
    init_logging();

    // int i = 0; int k = 7; while (i < 10) { i++; } return k;
    let method = static_method(
        "loop",
        "()I",
        2,
        2,
        vec![
            IConst0,
            IStore(0),
            BiPush(7),
            IStore(1),
            ILoad(0),
            BiPush(10),
            IfICmp(OrdComparison::GE, InsnIndex(9)),
            IInc(0, 1),
            Goto(InsnIndex(4)),
            ILoad(1),
            IReturn,
        ],
    );
    let cfg = blocks(11, &[0, 4, 7, 9], &[(0, 1), (1, 2), (1, 3), (2, 1)]);
    let frames = Analyzer::new(Settings::unbounded())
        .analyze(&method, &cfg)
        .unwrap();

    assert_eq!(frames.before(InsnIndex(4)).unwrap().locals, vec![Value::TOP, int(7)]);
    assert_eq!(
        frames.before(InsnIndex(6)).unwrap().stack,
        vec![Value::TOP, int(10)]
    );
    assert_eq!(frames.after(InsnIndex(7)).unwrap().locals[0], Value::INT);
    assert_eq!(frames.before(InsnIndex(10)).unwrap().stack, vec![int(7)]);

    // Once a slot has lost its literal at the join point, nothing brings it back
    for (idx, frame) in frames.iter().filter(|(idx, _)| idx.0 >= 4) {
        assert!(
            !frame.locals[0].has_literal(),
            "literal for `i` reappeared at {:?}",
            idx
        );
    }
}

#[test]
fn exception_handlers_see_every_protected_state() {
    init_logging();

    // int x = 1; try { x = 2; } catch (RuntimeException e) { return x; } return x;
    let method = static_method(
        "catcher",
        "()I",
        2,
        1,
        vec![
            IConst1,
            IStore(0),
            IConst2,
            IStore(0),
            ILoad(0),
            IReturn,
            AStore(1),
            ILoad(0),
            IReturn,
        ],
    );
    let runtime_exception = class("java/lang/RuntimeException");
    let mut cfg = ControlFlowGraph::new();
    let entry = cfg.add_block(0..2);
    let protected = cfg.add_block(2..4);
    let normal_exit = cfg.add_block(4..6);
    let handler = cfg.add_block(6..9);
    cfg.add_edge(entry, protected);
    cfg.add_edge(protected, normal_exit);
    cfg.add_exception_edge(protected, handler, Some(runtime_exception.clone()));

    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    let handler_entry = frames.before(InsnIndex(6)).unwrap();
    assert_eq!(handler_entry.stack, vec![Value::object(runtime_exception.clone())]);
    assert_eq!(handler_entry.locals, vec![Value::TOP, Value::UNINITIALIZED]);
    assert_eq!(
        frames.before(InsnIndex(7)).unwrap().locals[1],
        Value::object(runtime_exception)
    );
    assert_eq!(frames.before(InsnIndex(5)).unwrap().stack, vec![int(2)]);
}

#[test]
fn catch_all_handlers_use_the_default_exception() {
    init_logging();

    let method = static_method(
        "finally",
        "()V",
        1,
        1,
        vec![IConst1, IStore(0), Return, AStore(0), Return],
    );
    let mut cfg = ControlFlowGraph::new();
    let protected = cfg.add_block(0..3);
    let handler = cfg.add_block(3..5);
    cfg.add_exception_edge(protected, handler, None);

    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();
    assert_eq!(
        frames.before(InsnIndex(3)).unwrap().stack,
        vec![Value::object(class("java/lang/Throwable"))]
    );

    let settings = Settings {
        default_exception_type: class("java/lang/Exception"),
        ..Settings::default()
    };
    let frames = Analyzer::new(settings).analyze(&method, &cfg).unwrap();
    assert_eq!(
        frames.before(InsnIndex(3)).unwrap().stack,
        vec![Value::object(class("java/lang/Exception"))]
    );
}

#[test]
fn subroutines() {
    init_logging();

    // 0: jsr 2  1: return  2: astore_0  3: ret 0
    let method = static_method(
        "sub",
        "()V",
        1,
        1,
        vec![Jsr(InsnIndex(2)), Return, AStore(0), Ret(0)],
    );
    let mut cfg = ControlFlowGraph::new();
    let caller = cfg.add_block(0..1);
    let after_call = cfg.add_block(1..2);
    let subroutine = cfg.add_block(2..4);
    cfg.add_edge(caller, subroutine);
    cfg.add_edge(subroutine, after_call);

    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();
    assert_eq!(frames.before(InsnIndex(2)).unwrap().stack, vec![Value::RETURN_ADDRESS]);
    assert_eq!(
        frames.before(InsnIndex(1)).unwrap().locals,
        vec![Value::RETURN_ADDRESS]
    );
    assert_eq!(cfg.successors(BlockId(2)).len(), 1);
}

#[test]
fn switches_pop_their_key() {
    init_logging();

    let method = static_method(
        "switch",
        "(I)I",
        1,
        1,
        vec![
            ILoad(0),
            TableSwitch {
                default: InsnIndex(4),
                low: 0,
                targets: vec![InsnIndex(2)],
            },
            IConst1,
            IReturn,
            IConst0,
            IReturn,
        ],
    );
    let cfg = blocks(6, &[0, 2, 4], &[(0, 1), (0, 2)]);
    let frames = Analyzer::default().analyze(&method, &cfg).unwrap();

    assert!(frames.after(InsnIndex(1)).unwrap().stack.is_empty());
    assert_eq!(frames.before(InsnIndex(3)).unwrap().stack, vec![int(1)]);
    assert_eq!(frames.before(InsnIndex(5)).unwrap().stack, vec![int(0)]);
}
