//! In-place heap sort with a caller-supplied key.

/// Sort `items` in ascending order of `key`, in place and without allocating.
///
/// The sort is not stable. Items whose keys compare as unordered (NaN) keep
/// an unspecified position.
pub fn heap_sort_by_key<T, K, F>(items: &mut [T], key: F)
where
    T: Copy,
    K: PartialOrd,
    F: Fn(&T) -> K,
{
    let n = items.len();
    if n < 2 {
        return;
    }
    let mut k = n / 2;
    let mut last = n - 1;
    loop {
        let tmp = if k > 0 {
            k -= 1;
            items[k]
        } else {
            let tmp = items[last];
            items[last] = items[0];
            last -= 1;
            if last == 0 {
                items[0] = tmp;
                return;
            }
            tmp
        };
        let tmp_key = key(&tmp);
        let mut i = k;
        loop {
            let mut j = 2 * i + 1;
            if j > last {
                break;
            }
            if j < last && key(&items[j]) < key(&items[j + 1]) {
                j += 1;
            }
            if key(&items[j]) <= tmp_key {
                break;
            }
            items[i] = items[j];
            i = j;
        }
        items[i] = tmp;
    }
}
