//! Reference programs with known results.

/// Address of the primality verdict byte.
pub const PRIME_RESULT: u32 = 0x100;

/// Trial division of `a0 = 1109`; stores 1 at `PRIME_RESULT` when prime, 0 otherwise.
pub const PRIME_1109: &str = "
        li   a0, 1109
        li   t0, 2            # divisor
        li   t2, 1            # verdict
loop:   mul  t1, t0, t0
        bgt  t1, a0, done
        rem  t1, a0, t0
        beqz t1, composite
        addi t0, t0, 1
        j    loop
composite:
        li   t2, 0
done:   sb   t2, 0x100(zero)
";

/// Builds the primality program for an arbitrary candidate.
pub fn prime(candidate: i32) -> String {
    PRIME_1109.replace("1109", &candidate.to_string())
}

/// Address of the array sum.
pub const SUM_RESULT: u32 = 0x300;

/// Stores `(i + 3)^2` for `i in 0..8` at `0x200`, then sums them back (380).
pub const SUM_OF_SQUARES: &str = "
        li   t0, 0x200
        li   t1, 0
        li   t2, 8
fill:   slli t3, t1, 2
        add  t3, t3, t0
        addi t4, t1, 3
        mul  t4, t4, t4
        sw   t4, 0(t3)
        addi t1, t1, 1
        blt  t1, t2, fill
        li   t1, 0
        li   a0, 0
sum:    slli t3, t1, 2
        add  t3, t3, t0
        lw   t4, 0(t3)
        add  a0, a0, t4
        addi t1, t1, 1
        blt  t1, t2, sum
        sw   a0, 0x300(zero)
";

/// Address of the Fibonacci result.
pub const FIB_RESULT: u32 = 0x104;

/// Calls an iterative Fibonacci routine through `jal`/`ret`; F(10) = 55.
pub const FIB_CALL: &str = "
        li   a0, 10
        jal  fib
        sw   a1, 0x104(zero)
        j    end
fib:    li   t0, 0
        li   a1, 1
step:   beqz a0, back
        add  t1, t0, a1
        mv   t0, a1
        mv   a1, t1
        addi a0, a0, -1
        j    step
back:   mv   a1, t0
        ret
end:    nop
";

/// Base of the per-core counter slots.
pub const COUNTERS: u32 = 0x400;

/// Each core increments its own word at `0x400 + 4 * tp` twenty times.
///
/// All slots share one cache line, so cores contend for it.
pub const PER_CORE_COUNTERS: &str = "
        slli s0, tp, 2
        li   t1, 0
        li   t2, 20
loop:   lw   t3, 0x400(s0)
        addi t3, t3, 1
        sw   t3, 0x400(s0)
        addi t1, t1, 1
        blt  t1, t2, loop
";

/// Ends early through `ret` with `ra == 0`; the trailing store never runs.
pub const EARLY_EXIT: &str = "
        li   a0, 7
        sw   a0, 0x500(zero)
        ret
        li   a0, 9
        sw   a0, 0x500(zero)
";
